use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

/// Owned rayon pool shared by the world's background work (light tasks and
/// the compute light backend).
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        Self::named(num_threads, "grotto-worker")
    }

    pub fn named(num_threads: Option<usize>, name: &str) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(count) = num_threads.filter(|count| *count > 0) {
            builder = builder.num_threads(count);
        }

        let prefix = name.to_owned();
        let pool = builder
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()?;
        debug!("Started job system '{name}' with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }

    pub fn scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&rayon::Scope<'scope>) -> R + Send,
        R: Send,
    {
        self.pool.scope(op)
    }

    /// Runs `op` inside the pool so nested rayon iterators use its threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}
