//! Query front-end
//!
//! [`Beagle`] ties the pieces together for one query: it snapshots the
//! type graph, walks every allocation zone, validates and matches each
//! block, and shapes the survivors into the final result.

use super::matcher::{ClassMatcher, ClassQuery};
use super::names::classes_matching;
use super::shaper::ResultShaper;
use crate::config::{validate_config, Config};
use crate::core::types::{
    Address, BeagleResult, CompareOptions, FindOptions, ObjectHandle, TypeHandle,
};
use crate::memory::{
    AllocationEnumerator, AllocationSource, HeaderLayout, ObjectValidator, ScanGuard,
};
use crate::registry::{HazardSet, TypeGraph, TypeRegistry};
use std::ops::ControlFlow;
use tracing::{debug, trace, warn};

/// Instance finder over one registry and one allocation source
pub struct Beagle<'a> {
    registry: &'a dyn TypeRegistry,
    source: &'a dyn AllocationSource,
    hazards: HazardSet,
    layout: HeaderLayout,
}

impl<'a> Beagle<'a> {
    /// No hazard types, [`HeaderLayout::TAGGED`] headers
    pub fn new(registry: &'a dyn TypeRegistry, source: &'a dyn AllocationSource) -> Self {
        Beagle {
            registry,
            source,
            hazards: HazardSet::none(),
            layout: HeaderLayout::default(),
        }
    }

    pub fn with_hazards(mut self, hazards: HazardSet) -> Self {
        self.hazards = hazards;
        self
    }

    pub fn with_layout(mut self, layout: HeaderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Build from a validated configuration
    ///
    /// Hazard type names are resolved now; names not registered yet are
    /// skipped.
    pub fn from_config(
        config: &Config,
        registry: &'a dyn TypeRegistry,
        source: &'a dyn AllocationSource,
    ) -> BeagleResult<Self> {
        validate_config(config)?;
        let hazards = HazardSet::from_names(registry, &config.hazards.types);
        Ok(Beagle::new(registry, source)
            .with_hazards(hazards)
            .with_layout(config.scanner.header_layout()))
    }

    pub fn hazards(&self) -> &HazardSet {
        &self.hazards
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Find live instances of `ty`
    ///
    /// Conflicting options fail before any zone is touched. Calling this
    /// from inside another scan on the same thread fails with
    /// `ReentrantScan`. A type that is not live yields an empty result.
    pub fn find_instances(
        &self,
        ty: TypeHandle,
        options: FindOptions,
    ) -> BeagleResult<Vec<ObjectHandle>> {
        let options = options.validate()?;
        let guard = ScanGuard::enter()?;

        let graph = TypeGraph::snapshot(self.registry);
        if !graph.contains(ty) {
            trace!(target_type = %ty, "target type not live");
            return Ok(Vec::new());
        }

        let query = ClassQuery::from_options(ty, options);
        let matcher = ClassMatcher::new(&graph);
        let validator = ObjectValidator::new(&graph, &self.hazards, self.layout);
        let mut shaper = ResultShaper::new(ty, options)?;
        let mut matched = 0usize;

        let stats = AllocationEnumerator::new(self.source).walk(&guard, |block| {
            let Some(candidate) = validator.inspect(&block) else {
                return ControlFlow::Continue(());
            };
            if !matcher.matches(candidate.type_handle, &query) {
                return ControlFlow::Continue(());
            }
            matched += 1;
            shaper.offer(candidate)
        });

        let results = shaper.finish();
        if stats.untracked_blocks > 0 {
            warn!(
                target_type = %ty,
                untracked = stats.untracked_blocks,
                "allocation source lost track of some blocks; results may be incomplete"
            );
        }
        debug!(
            target_type = %ty,
            zones_walked = stats.zones_walked,
            zones_skipped = stats.zones_skipped,
            blocks = stats.blocks_visited,
            untracked = stats.untracked_blocks,
            matched,
            returned = results.len(),
            "heap scan finished"
        );
        Ok(results)
    }

    /// Instances of `ty` and its descendants
    pub fn instances_of(&self, ty: TypeHandle) -> BeagleResult<Vec<ObjectHandle>> {
        self.find_instances(ty, FindOptions::DEFAULT)
    }

    /// Instances of exactly `ty`
    pub fn exact_instances_of(&self, ty: TypeHandle) -> BeagleResult<Vec<ObjectHandle>> {
        self.find_instances(ty, FindOptions::EXCLUDE_SUBCLASSES)
    }

    pub fn first_instance_of(&self, ty: TypeHandle) -> BeagleResult<Option<ObjectHandle>> {
        Ok(self
            .find_instances(ty, FindOptions::FIRST_MATCH)?
            .into_iter()
            .next())
    }

    /// Like [`find_instances`](Self::find_instances), by type name
    ///
    /// An unknown name is an empty result, not an error.
    pub fn find_instances_named(
        &self,
        name: &str,
        options: FindOptions,
    ) -> BeagleResult<Vec<ObjectHandle>> {
        let options = options.validate()?;
        match self.registry.resolve(name) {
            Some(ty) => self.find_instances(ty, options),
            None => {
                trace!(type_name = name, "no live type with this name");
                Ok(Vec::new())
            }
        }
    }

    pub fn instances_named(&self, name: &str) -> BeagleResult<Vec<ObjectHandle>> {
        self.find_instances_named(name, FindOptions::DEFAULT)
    }

    pub fn exact_instances_named(&self, name: &str) -> BeagleResult<Vec<ObjectHandle>> {
        self.find_instances_named(name, FindOptions::EXCLUDE_SUBCLASSES)
    }

    pub fn first_instance_named(&self, name: &str) -> BeagleResult<Option<ObjectHandle>> {
        Ok(self
            .find_instances_named(name, FindOptions::FIRST_MATCH)?
            .into_iter()
            .next())
    }

    /// Identify the live object whose allocation starts at `address`
    ///
    /// `None` when no live block starts there or the block does not hold a
    /// valid header. Hazard types are reported with `hazardous` set rather
    /// than hidden.
    pub fn object_at(&self, address: Address) -> BeagleResult<Option<ObjectHandle>> {
        let guard = ScanGuard::enter()?;
        let graph = TypeGraph::snapshot(self.registry);
        let validator = ObjectValidator::new(&graph, &self.hazards, self.layout);

        let mut found = None;
        AllocationEnumerator::new(self.source).walk(&guard, |block| {
            if block.address() != address {
                return ControlFlow::Continue(());
            }
            found = validator.inspect(&block).map(|candidate| {
                ObjectHandle::new(candidate.address, candidate.type_handle, candidate.hazardous)
            });
            ControlFlow::Break(())
        });

        trace!(%address, found = found.is_some(), "address lookup finished");
        Ok(found)
    }

    /// Live types descending from `ty`, in registry order
    pub fn subclasses_of(&self, ty: TypeHandle) -> Vec<TypeHandle> {
        let graph = TypeGraph::snapshot(self.registry);
        ClassMatcher::new(&graph).subclasses(ty)
    }

    pub fn subclasses_named(&self, name: &str) -> Vec<TypeHandle> {
        self.registry
            .resolve(name)
            .map(|ty| self.subclasses_of(ty))
            .unwrap_or_default()
    }

    /// Live types whose names match `partial`
    pub fn classes_matching(&self, partial: &str, options: CompareOptions) -> Vec<TypeHandle> {
        let graph = TypeGraph::snapshot(self.registry);
        classes_matching(&graph, partial, options)
    }

    pub fn type_name(&self, ty: TypeHandle) -> Option<String> {
        self.registry.name_of(ty)
    }
}
