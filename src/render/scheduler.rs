use crate::foundation::core::Rect;
use crate::foundation::error::{StrataError, StrataResult};

/// Options controlling how compositing work is spread over threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositorOpts {
    /// Override the number of rayon worker threads. `None` uses the logical CPU count.
    pub threads: Option<usize>,
}

impl CompositorOpts {
    /// Defaults, with `threads` taken from `STRATA_THREADS` when it holds a positive integer.
    pub fn from_env() -> Self {
        let threads = std::env::var("STRATA_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0);
        Self { threads }
    }
}

/// Partitions dirty rectangles across a dedicated thread pool and runs the
/// per-slice work, joining before it returns.
#[derive(Debug)]
pub struct TileScheduler {
    pool: rayon::ThreadPool,
}

impl TileScheduler {
    /// Build a scheduler owning its own pool.
    pub fn new(opts: &CompositorOpts) -> StrataResult<Self> {
        Ok(Self {
            pool: build_thread_pool(opts.threads)?,
        })
    }

    /// Number of slices an update is split into.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads().max(1)
    }

    /// Split `items` into `n` contiguous slices by index.
    ///
    /// Slice `i` covers `[i*len/n, (i+1)*len/n)`. When there are fewer items
    /// than slices some slices are empty. `n == 0` is treated as 1.
    pub fn split_evenly<T>(items: &[T], n: usize) -> Vec<&[T]> {
        let n = n.max(1);
        let len = items.len();
        (0..n)
            .map(|i| &items[i * len / n..(i + 1) * len / n])
            .collect()
    }

    /// Cut `rect` into up to `n` horizontal bands of near-equal height.
    ///
    /// Band `i` spans rows `[top + h*i/n, top + h*(i+1)/n)`; empty bands are
    /// dropped, so a rectangle shorter than `n` rows yields one band per row.
    pub fn split_rectangle(rect: Rect, n: usize) -> Vec<Rect> {
        if rect.is_empty() {
            return Vec::new();
        }
        let n = n.max(1) as i64;
        let (top, h) = (i64::from(rect.top()), i64::from(rect.height));
        (0..n)
            .map(|i| {
                let y0 = top + h * i / n;
                let y1 = top + h * (i + 1) / n;
                Rect::new(rect.x, y0 as i32, rect.width, (y1 - y0) as i32)
            })
            .filter(|r| !r.is_empty())
            .collect()
    }

    /// Run `work` once per job: every job but the last on the pool, the last on
    /// the calling thread.
    ///
    /// Returns only after every job has finished. Failures are collected per
    /// job and surfaced together; a panicking job is re-raised after the join.
    pub fn fan_out<J, F>(&self, jobs: Vec<J>, work: F) -> StrataResult<()>
    where
        J: Send,
        F: Fn(usize, J) -> StrataResult<()> + Sync,
    {
        let n = jobs.len();
        if n == 0 {
            return Ok(());
        }
        let mut results: Vec<StrataResult<()>> = (0..n).map(|_| Ok(())).collect();
        let work = &work;

        self.pool.in_place_scope(|scope| {
            let mut jobs = jobs.into_iter();
            let mut slots = results.iter_mut();
            let inline = jobs.next_back().zip(slots.next_back());

            for (i, (job, slot)) in jobs.zip(slots).enumerate() {
                scope.spawn(move |_| *slot = work(i, job));
            }
            if let Some((job, slot)) = inline {
                *slot = work(n - 1, job);
            }
        });

        let failures: Vec<StrataError> = results.into_iter().filter_map(Result::err).collect();
        match StrataError::aggregate(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> StrataResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StrataError::validation(
            "compositor 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("strata-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StrataError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
