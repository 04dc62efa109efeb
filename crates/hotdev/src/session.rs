//! The hotdev session.
//!
//! A [`Hotdev`] ties one compiler to one artifact store, one compile state
//! and one event stream. It is a cheap handle: clones share everything, and
//! the compiler only ever sees a [`CompileHooks`] holding a weak reference,
//! so a dropped session is never kept alive by its own compiler.

use crate::compiler::{CompileContext, Compiler, Watching};
use crate::config::{HotdevConfig, Settings};
use crate::error::{CompilerError, HotdevError, Result};
use crate::events::{Action, EventStream};
use crate::resolve::{AssetResolver, PublicPathMapping};
use crate::state::{CompileState, CompileStatus, PendingFlush, Rebuild};
use crate::stats::CompileResult;
use crate::store::MemoryFs;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

pub(crate) struct Shared {
    pub(crate) settings: Settings,
    pub(crate) compiler: Arc<dyn Compiler>,
    pub(crate) store: MemoryFs,
    pub(crate) state: CompileState,
    pub(crate) events: EventStream,
    pub(crate) resolver: AssetResolver,
    watching: Mutex<Option<Box<dyn Watching>>>,
    runtime: Handle,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(watching) = self.watching.get_mut().take() {
            watching.close();
        }
    }
}

/// A development session serving one compiler's output.
#[derive(Clone)]
pub struct Hotdev {
    pub(crate) shared: Arc<Shared>,
}

impl Hotdev {
    /// Validate `config` and create a session for `compiler`.
    ///
    /// Must be called from within a tokio runtime: the heartbeat and the
    /// deferred callback flush run on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no runtime is
    /// available.
    pub fn new(config: &HotdevConfig, compiler: Arc<dyn Compiler>) -> Result<Self> {
        let settings = config.validate()?;
        let runtime = Handle::try_current().map_err(|_| HotdevError::NoRuntime)?;

        let resolver = AssetResolver::new(PublicPathMapping::from(&compiler.output()))
            .with_bundles(compiler.bundles().iter().map(PublicPathMapping::from).collect());

        let events = EventStream::new();
        events.start_heartbeat(settings.heartbeat);

        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                compiler,
                store: MemoryFs::new(),
                state: CompileState::new(),
                events,
                resolver,
                watching: Mutex::new(None),
                runtime,
            }),
        })
    }

    /// Start compiling: one run in lazy mode, watch mode otherwise.
    pub fn start(&self) -> Result<()> {
        if self.shared.settings.lazy {
            info!("Lazy mode: compiling on request");
            self.rebuild()?;
            return Ok(());
        }

        let watching = self
            .shared
            .compiler
            .watch(&self.shared.settings.watch_options, self.context())?;
        let previous = self.shared.watching.lock().replace(watching);
        if let Some(previous) = previous {
            previous.close();
        }
        Ok(())
    }

    /// Force a recompile of a running watch. Does nothing otherwise.
    pub fn invalidate(&self) {
        match self.shared.watching.lock().as_ref() {
            Some(watching) => watching.invalidate(),
            None => debug!("invalidate ignored: not watching"),
        }
    }

    /// Stop reacting to the compiler and stop watching.
    ///
    /// Requests already waiting for a build keep waiting; new requests are
    /// served from whatever the store holds.
    pub fn close(&self) {
        self.shared.state.close();
        let watching = self.shared.watching.lock().take();
        if let Some(watching) = watching {
            watching.close();
        }
        debug!("session closed");
    }

    /// Ask for a one-shot compile.
    ///
    /// At most one compile is in flight: a request made while one is pending
    /// is folded into a single follow-up compile. If the compiler refuses to
    /// run, the compile state is restored and the error returned.
    pub fn rebuild(&self) -> Result<(), CompilerError> {
        if self.shared.state.is_closed() {
            return Ok(());
        }
        match self.shared.state.request_rebuild() {
            Rebuild::Run => {
                debug!("starting compile");
                let started = self.shared.compiler.run(self.context());
                if started.is_err() {
                    if let Some(pending) = self.shared.state.cancel_rebuild() {
                        schedule_flush(&self.shared, pending);
                    }
                }
                started
            }
            Rebuild::Coalesced => {
                debug!("compile in flight, rebuild queued");
                Ok(())
            }
        }
    }

    /// Context handed to the compiler.
    pub fn context(&self) -> CompileContext {
        CompileContext {
            output: self.shared.store.clone(),
            hooks: self.hooks(),
        }
    }

    pub fn hooks(&self) -> CompileHooks {
        CompileHooks {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn store(&self) -> &MemoryFs {
        &self.shared.store
    }

    pub fn events(&self) -> &EventStream {
        &self.shared.events
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.shared.resolver
    }

    pub fn status(&self) -> CompileStatus {
        self.shared.state.status()
    }

    pub fn latest(&self) -> Option<Arc<CompileResult>> {
        self.shared.state.latest()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }

    /// Wait for the next valid build.
    pub async fn ready(&self) -> Option<Arc<CompileResult>> {
        self.shared.state.ready().await
    }
}

/// Lifecycle callbacks handed to a [`Compiler`].
///
/// Cheap to clone and safe to call from any thread. Calls made after the
/// session was closed or dropped are ignored.
#[derive(Clone)]
pub struct CompileHooks {
    shared: Weak<Shared>,
}

impl CompileHooks {
    fn session(&self) -> Option<Arc<Shared>> {
        self.shared.upgrade().filter(|shared| !shared.state.is_closed())
    }

    /// Sources changed, or a run is about to begin.
    pub fn on_invalid(&self) {
        if let Some(shared) = self.session() {
            shared.state.on_invalidated();
            debug!("compile invalidated");
        }
    }

    /// A compile began.
    pub fn on_start(&self) {
        if let Some(shared) = self.session() {
            shared.state.on_compile_start();
            info!("Building...");
            shared.events.publish_building();
        }
    }

    /// A compile finished, with or without diagnostics.
    pub fn on_done(&self, result: CompileResult) {
        let Some(shared) = self.session() else {
            return;
        };
        let result = Arc::new(result);
        let Some(completion) = shared.state.on_compile_done(Arc::clone(&result)) else {
            return;
        };

        for bundle in result.bundles() {
            info!(
                "Built {}{} in {}ms",
                bundle.name.as_deref().map(|n| format!("{} ", n)).unwrap_or_default(),
                bundle.hash,
                bundle.time_ms
            );
        }
        report(&shared, &result);
        shared.events.publish_result(Action::Built, &result);

        schedule_flush(&shared, completion.flush);

        if completion.rebuild {
            let session = Hotdev { shared };
            if let Err(e) = session.rebuild() {
                error!("Rebuild failed: {}", e);
            }
        }
    }
}

fn report(shared: &Shared, result: &CompileResult) {
    let text = shared
        .compiler
        .format_stats(result, &shared.settings.stats_options);
    if result.has_errors() {
        error!("Compiled with errors.\n{}", text);
    } else if result.has_warnings() {
        warn!("Compiled with warnings.\n{}", text);
    } else {
        info!("Compiled successfully.\n{}", text);
    }
}

/// Release waiting requests once the current tick is over, unless the build
/// was invalidated in the meantime.
fn schedule_flush(shared: &Arc<Shared>, pending: PendingFlush) {
    let weak = Arc::downgrade(shared);
    shared.runtime.spawn(async move {
        tokio::task::yield_now().await;
        if let Some(shared) = weak.upgrade() {
            let released = shared.state.flush(pending);
            if released > 0 {
                debug!(released, "released waiting requests");
            }
        }
    });
}
