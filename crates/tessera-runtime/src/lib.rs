//! Background generation lanes and the single-consumer completion queues.
#![forbid(unsafe_code)]

mod generator;
mod queue;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessera_geom::Vec2;
use tessera_mesh_cpu::MeshBuildResult;
use tessera_world::HeightField;

use crate::queue::CompletionQueue;

pub use crate::generator::{Preview, PreviewMode, TerrainGenerator, TerrainSource};
pub use rayon::ThreadPoolBuildError;

/// Invoked on the draining thread with the consumer context and the finished field.
pub type HeightCallback<C> = Box<dyn FnOnce(&mut C, Arc<HeightField>) + Send>;
/// Invoked on the draining thread with the consumer context and the finished mesh.
pub type MeshCallback<C> = Box<dyn FnOnce(&mut C, Arc<MeshBuildResult>) + Send>;

struct HeightJob<C> {
    sample_center: Vec2,
    on_complete: HeightCallback<C>,
}

struct MeshJob<C> {
    field: Arc<HeightField>,
    lod: u8,
    on_complete: MeshCallback<C>,
}

#[derive(Default)]
struct LaneCounters {
    queued: AtomicUsize,
    inflight: AtomicUsize,
}

impl LaneCounters {
    fn submitted(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    // Raise in-flight before lowering queued so the job is never invisible to `is_idle`.
    fn started(&self) {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    fn finished(&self) {
        self.inflight.fetch_sub(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::SeqCst),
            self.inflight.load(Ordering::SeqCst),
        )
    }
}

pub struct Runtime<C> {
    source: Arc<dyn TerrainSource>,
    height_tx: Sender<HeightJob<C>>,
    mesh_tx: Sender<MeshJob<C>>,
    height_done: Arc<CompletionQueue<(HeightCallback<C>, Arc<HeightField>)>>,
    mesh_done: Arc<CompletionQueue<(MeshCallback<C>, Arc<MeshBuildResult>)>>,
    height_ctr: Arc<LaneCounters>,
    mesh_ctr: Arc<LaneCounters>,
    _height_pool: ThreadPool,
    _mesh_pool: ThreadPool,
    w_height: usize,
    w_mesh: usize,
}

impl<C: 'static> Runtime<C> {
    /// Splits the machine's parallelism between the height and mesh lanes.
    pub fn new(source: Arc<dyn TerrainSource>) -> Result<Self, ThreadPoolBuildError> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let w_height = (workers / 3).max(1);
        let w_mesh = workers.saturating_sub(w_height).max(1);
        Self::with_workers(source, w_height, w_mesh)
    }

    pub fn with_workers(
        source: Arc<dyn TerrainSource>,
        w_height: usize,
        w_mesh: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let w_height = w_height.max(1);
        let w_mesh = w_mesh.max(1);
        let (height_tx, height_rx) = unbounded::<HeightJob<C>>();
        let (mesh_tx, mesh_rx) = unbounded::<MeshJob<C>>();
        let height_done = Arc::new(CompletionQueue::new());
        let mesh_done = Arc::new(CompletionQueue::new());
        let height_ctr = Arc::new(LaneCounters::default());
        let mesh_ctr = Arc::new(LaneCounters::default());

        let height_pool = ThreadPoolBuilder::new()
            .num_threads(w_height)
            .thread_name(|i| format!("tessera-height-{i}"))
            .build()?;
        for _ in 0..w_height {
            let rx = height_rx.clone();
            let done = Arc::clone(&height_done);
            let ctr = Arc::clone(&height_ctr);
            let source = Arc::clone(&source);
            height_pool.spawn(move || run_height_lane(rx, source, done, ctr));
        }

        let mesh_pool = ThreadPoolBuilder::new()
            .num_threads(w_mesh)
            .thread_name(|i| format!("tessera-mesh-{i}"))
            .build()?;
        for _ in 0..w_mesh {
            let rx = mesh_rx.clone();
            let done = Arc::clone(&mesh_done);
            let ctr = Arc::clone(&mesh_ctr);
            let source = Arc::clone(&source);
            mesh_pool.spawn(move || run_mesh_lane(rx, source, done, ctr));
        }

        log::debug!(
            target: "runtime",
            "runtime started: {} height workers, {} mesh workers",
            w_height,
            w_mesh
        );

        Ok(Self {
            source,
            height_tx,
            mesh_tx,
            height_done,
            mesh_done,
            height_ctr,
            mesh_ctr,
            _height_pool: height_pool,
            _mesh_pool: mesh_pool,
            w_height,
            w_mesh,
        })
    }

    pub fn source(&self) -> &Arc<dyn TerrainSource> {
        &self.source
    }

    pub fn worker_counts(&self) -> (usize, usize) {
        (self.w_height, self.w_mesh)
    }

    pub fn request_height_map(
        &self,
        sample_center: Vec2,
        on_complete: impl FnOnce(&mut C, Arc<HeightField>) + Send + 'static,
    ) {
        self.height_ctr.submitted();
        let job = HeightJob {
            sample_center,
            on_complete: Box::new(on_complete),
        };
        if self.height_tx.send(job).is_err() {
            self.height_ctr.queued.fetch_sub(1, Ordering::SeqCst);
            log::error!(target: "runtime", "height lane closed; request dropped");
        }
    }

    pub fn request_mesh(
        &self,
        field: Arc<HeightField>,
        lod: u8,
        on_complete: impl FnOnce(&mut C, Arc<MeshBuildResult>) + Send + 'static,
    ) {
        self.mesh_ctr.submitted();
        let job = MeshJob {
            field,
            lod,
            on_complete: Box::new(on_complete),
        };
        if self.mesh_tx.send(job).is_err() {
            self.mesh_ctr.queued.fetch_sub(1, Ordering::SeqCst);
            log::error!(target: "runtime", "mesh lane closed; request dropped");
        }
    }

    /// Runs every completed callback on the calling thread. Returns how many ran.
    ///
    /// Each queue is swapped out once, so callbacks that issue new requests never extend
    /// the current pass.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let heights = self.height_done.take();
        let meshes = self.mesh_done.take();
        let ran = heights.len() + meshes.len();
        for (cb, field) in heights {
            cb(ctx, field);
        }
        for (cb, mesh) in meshes {
            cb(ctx, mesh);
        }
        ran
    }

    /// (height queued, height in-flight, mesh queued, mesh in-flight)
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        let (hq, hi) = self.height_ctr.snapshot();
        let (mq, mi) = self.mesh_ctr.snapshot();
        (hq, hi, mq, mi)
    }

    /// Completions waiting for the next drain: (height, mesh).
    pub fn pending_completions(&self) -> (usize, usize) {
        (self.height_done.len(), self.mesh_done.len())
    }

    /// Nothing queued, running, or waiting to be drained.
    pub fn is_idle(&self) -> bool {
        let (hq, hi, mq, mi) = self.queue_debug_counts();
        hq + hi + mq + mi == 0 && self.pending_completions() == (0, 0)
    }
}

fn run_height_lane<C>(
    rx: Receiver<HeightJob<C>>,
    source: Arc<dyn TerrainSource>,
    done: Arc<CompletionQueue<(HeightCallback<C>, Arc<HeightField>)>>,
    ctr: Arc<LaneCounters>,
) {
    while let Ok(job) = rx.recv() {
        ctr.started();
        let HeightJob {
            sample_center,
            on_complete,
        } = job;
        match panic::catch_unwind(AssertUnwindSafe(|| source.height_map(sample_center))) {
            Ok(field) => done.push((on_complete, Arc::new(field))),
            Err(_) => log::error!(
                target: "runtime",
                "height job at ({}, {}) panicked; callback dropped",
                sample_center.x,
                sample_center.y
            ),
        }
        ctr.finished();
    }
}

fn run_mesh_lane<C>(
    rx: Receiver<MeshJob<C>>,
    source: Arc<dyn TerrainSource>,
    done: Arc<CompletionQueue<(MeshCallback<C>, Arc<MeshBuildResult>)>>,
    ctr: Arc<LaneCounters>,
) {
    while let Ok(job) = rx.recv() {
        ctr.started();
        let MeshJob {
            field,
            lod,
            on_complete,
        } = job;
        match panic::catch_unwind(AssertUnwindSafe(|| source.mesh(&field, lod))) {
            Ok(mesh) => done.push((on_complete, Arc::new(mesh))),
            Err(_) => log::error!(
                target: "runtime",
                "mesh job at lod {} panicked; callback dropped",
                lod
            ),
        }
        ctr.finished();
    }
}
