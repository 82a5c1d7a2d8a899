use std::env;
use std::path::PathBuf;

use grotto_world::{TilePos, TileType, World, WorldConfig};
use tracing::Level;

const MAP_COLUMNS: u32 = 120;

#[derive(Debug, PartialEq)]
struct Options {
    seed: u64,
    width: u32,
    height: u32,
    config: Option<PathBuf>,
    map: bool,
    verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 400,
            height: 600,
            config: None,
            map: false,
            verbose: false,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Inspect(Options),
    Help,
}

const USAGE: &str = "Usage: grotto_inspector [--seed <u64>] [--width <u32>] [--height <u32>] \
                     [--config <path.toml>] [--map] [--verbose]";

fn main() {
    let options = match parse_args(env::args().skip(1)) {
        Ok(Command::Inspect(options)) => options,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let level = if options.verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .try_init();

    if let Err(err) = run(&options) {
        eprintln!("grotto_inspector error: {err}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => options.seed = parse_value(&arg, args.next())?,
            "--width" => options.width = parse_value(&arg, args.next())?,
            "--height" => options.height = parse_value(&arg, args.next())?,
            "--config" => {
                let path = args.next().ok_or("--config expects a path argument")?;
                options.config = Some(PathBuf::from(path));
            }
            "--map" => options.map = true,
            "--verbose" | "-v" => options.verbose = true,
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Command::Inspect(options))
}

fn parse_value<T>(flag: &str, value: Option<String>) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.ok_or_else(|| format!("{flag} expects a numeric argument"))?;
    value
        .parse()
        .map_err(|err| format!("invalid value for {flag} '{value}': {err}"))
}

fn run(options: &Options) -> Result<(), String> {
    let config = match &options.config {
        Some(path) => WorldConfig::load(path).map_err(|err| err.to_string())?,
        None => WorldConfig::default(),
    };
    let world = World::generate_with(options.width, options.height, options.seed, &config)
        .map_err(|err| err.to_string())?;

    let layers = world.layers();
    let spawn = world.spawn_point();
    let data = world.data();
    println!("Seed: {}", options.seed);
    println!("Size: {}x{} (playable {:?})", options.width, options.height, world.playable_area());
    println!(
        "Layers: surface {} / underground {} / cavern {} (dirt height {})",
        layers.surface, layers.underground, layers.cavern, layers.dirt_height
    );
    println!("Spawn: ({}, {})", spawn.x, spawn.y);
    for ty in TileType::ALL {
        println!("  {:<6} {}", ty.name(), data.count_blocks(ty));
    }
    println!("  walls  {}", data.count_walls());
    println!(
        "Light: {} backend, {:.1}% of cells lit",
        world.backend_name(),
        world.light_map().coverage() * 100.0
    );

    if options.map {
        for line in ascii_map(&world, MAP_COLUMNS) {
            println!("{line}");
        }
    }
    Ok(())
}

/// One character per `step`x`step` block, sampled at its top-left tile.
fn ascii_map(world: &World, columns: u32) -> Vec<String> {
    let area = world.area();
    let step = (area.width as u32).div_ceil(columns.max(1)).max(1) as i32;
    let spawn = world.spawn_point();

    (area.top()..area.bottom())
        .step_by(step as usize)
        .map(|y| {
            (area.left()..area.right())
                .step_by(step as usize)
                .map(|x| {
                    let pos = TilePos::new(x, y);
                    if spawn.x / step == x / step && spawn.y / step == y / step {
                        return '@';
                    }
                    glyph(world, pos)
                })
                .collect()
        })
        .collect()
}

fn glyph(world: &World, pos: TilePos) -> char {
    match world.get_block(pos).map(|tile| tile.ty) {
        Some(TileType::Stone) => '#',
        Some(TileType::Dirt) => '%',
        Some(TileType::Grass) => '"',
        Some(TileType::Wood) => '=',
        None if world.wall_exists(pos) => ':',
        None => ' ',
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{parse_args, Command, Options};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse_args(args(&[])), Ok(Command::Inspect(Options::default())));
    }

    #[test]
    fn parses_every_flag() {
        let parsed = parse_args(args(&[
            "--seed", "42", "--width", "300", "--height", "500", "--config", "world.toml", "--map",
            "-v",
        ]))
        .expect("valid arguments");
        assert_eq!(
            parsed,
            Command::Inspect(Options {
                seed: 42,
                width: 300,
                height: 500,
                config: Some(PathBuf::from("world.toml")),
                map: true,
                verbose: true,
            })
        );
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse_args(args(&["--seed", "1", "--help", "--bogus"])), Ok(Command::Help));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args(&["--seed"])).is_err());
        assert!(parse_args(args(&["--width", "wide"])).is_err());
        assert!(parse_args(args(&["--height", "-3"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert_eq!(
            parse_args(args(&["--frobnicate"])),
            Err("unknown argument: --frobnicate".to_string())
        );
    }
}
