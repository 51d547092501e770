//! Per-type codec cache.
//!
//! The first request for a type runs the whole pipeline (enumerate, plan,
//! render, build) and stores the result; every later request returns the stored
//! [`CodecEntry`]. Entries are never replaced or removed, so the cache grows with
//! the number of distinct types a process touches.
//!
//! # Thread Safety
//!
//! Lookups take a shared `RwLock`. Builds are serialized by a separate gate and
//! re-check the map after acquiring it, so concurrent first uses of a type build
//! it exactly once while lookups of other types proceed. A failed build caches
//! nothing; the next request for the type tries again.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use crate::config::Config;
use crate::host::{BuildHost, ClosureHost, CompiledCodec};
use crate::members::enumerate;
use crate::plan::{plan, LayoutPlan};
use crate::reflect::Flat;
use crate::render::{render, RenderedUnit};
use crate::strategy::Strategy;
use crate::Result;

/// The cached layout and codec of one type.
pub struct CodecEntry<T> {
    plan: Arc<LayoutPlan>,
    unit: RenderedUnit,
    codec: CompiledCodec<T>,
}

impl<T> CodecEntry<T> {
    pub fn plan(&self) -> &Arc<LayoutPlan> {
        &self.plan
    }

    pub fn unit(&self) -> &RenderedUnit {
        &self.unit
    }

    /// Rendered source of the codec.
    pub fn source(&self) -> &str {
        &self.unit.source
    }

    pub fn strategy(&self) -> Strategy {
        self.unit.strategy
    }

    pub fn codec(&self) -> &CompiledCodec<T> {
        &self.codec
    }

    pub fn encode(&self, value: &T) -> Result<Vec<u8>> {
        self.codec.encode(value)
    }

    pub fn encode_into(&self, value: &T, sink: &mut Vec<u8>) -> Result<usize> {
        self.codec.encode_into(value, sink)
    }

    pub fn encoded_len(&self, value: &T) -> Result<usize> {
        self.codec.size(value)
    }

    pub fn decode(&self, buffer: &[u8]) -> Result<T> {
        self.codec.decode(buffer)
    }

    pub fn decode_prefix(&self, buffer: &[u8]) -> Result<(T, usize)> {
        self.codec.read(buffer)
    }
}

type Entries = ahash::HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Codec cache keyed by type identity.
pub struct CodecRegistry<H: BuildHost = ClosureHost> {
    config: Config,
    host: H,
    entries: RwLock<Entries>,
    build_gate: Mutex<()>,
    builds: AtomicUsize,
}

impl CodecRegistry<ClosureHost> {
    pub fn new(config: Config) -> CodecRegistry<ClosureHost> {
        CodecRegistry::with_host(config, ClosureHost)
    }
}

impl Default for CodecRegistry<ClosureHost> {
    fn default() -> Self {
        CodecRegistry::new(Config::default())
    }
}

impl<H: BuildHost> CodecRegistry<H> {
    pub fn with_host(config: Config, host: H) -> CodecRegistry<H> {
        CodecRegistry {
            config,
            host,
            entries: RwLock::new(ahash::HashMap::with_hasher(
                ahash::RandomState::with_seeds(
                    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
                ),
            )),
            build_gate: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Number of cached types.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful builds performed by this registry.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn contains<T: Flat>(&self) -> bool {
        self.lookup::<T>().is_some()
    }

    /// Returns the codec of `T`, building it on first use.
    pub fn get_or_build<T: Flat>(&self) -> Result<Arc<CodecEntry<T>>> {
        if let Some(entry) = self.lookup::<T>() {
            return Ok(entry);
        }

        let _gate = self
            .build_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = self.lookup::<T>() {
            return Ok(entry);
        }

        let entry = Arc::new(self.build::<T>().inspect_err(|e| {
            log::warn!("failed to build codec for {}: {e}", T::type_name());
        })?);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), entry.clone());
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(entry)
    }

    pub fn encode<T: Flat>(&self, value: &T) -> Result<Vec<u8>> {
        self.get_or_build::<T>()?.encode(value)
    }

    pub fn encode_into<T: Flat>(&self, value: &T, sink: &mut Vec<u8>) -> Result<usize> {
        self.get_or_build::<T>()?.encode_into(value, sink)
    }

    pub fn encoded_len<T: Flat>(&self, value: &T) -> Result<usize> {
        self.get_or_build::<T>()?.encoded_len(value)
    }

    pub fn decode<T: Flat>(&self, buffer: &[u8]) -> Result<T> {
        self.get_or_build::<T>()?.decode(buffer)
    }

    pub fn decode_prefix<T: Flat>(&self, buffer: &[u8]) -> Result<(T, usize)> {
        self.get_or_build::<T>()?.decode_prefix(buffer)
    }

    pub fn layout_of<T: Flat>(&self) -> Result<Arc<LayoutPlan>> {
        Ok(self.get_or_build::<T>()?.plan().clone())
    }

    fn lookup<T: Flat>(&self) -> Option<Arc<CodecEntry<T>>> {
        let entry = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()?;
        entry.downcast::<CodecEntry<T>>().ok()
    }

    fn build<T: Flat>(&self) -> Result<CodecEntry<T>> {
        let members = enumerate::<T>(self.config.include_properties())?;
        let plan = plan(T::type_name(), &members.descriptors);
        let unit = render(&plan, self.config.strategy);
        let codec = self.host.build(&unit, &members.accessors)?;
        log::debug!(
            "built {} for {}: {} members, strategy {}, size {}",
            unit.type_name,
            T::type_name(),
            plan.len(),
            unit.strategy,
            plan.total_size,
        );
        Ok(CodecEntry {
            plan: Arc::new(plan),
            unit,
            codec,
        })
    }
}

static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();

/// The process-wide registry behind the free functions of this crate,
/// configured from the environment on first use.
pub fn global() -> &'static CodecRegistry {
    GLOBAL.get_or_init(|| CodecRegistry::new(Config::from_env()))
}
