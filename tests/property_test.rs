//! Property checks over random type hierarchies

use heap_beagle::core::types::FindOptions;
use heap_beagle::{
    Beagle, HazardSet, Tagged, TaggedBox, TrackingAllocator, TypeHandle, TypeTable,
};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{HashMap, HashSet};

#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();

/// Parent links and live instance counts, one entry per type
#[derive(Debug, Clone)]
struct Hierarchy {
    parents: Vec<Option<usize>>,
    counts: Vec<usize>,
}

impl Hierarchy {
    fn descends_from(&self, ty: usize, ancestor: usize) -> bool {
        let mut current = self.parents[ty];
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parents[parent];
        }
        false
    }

    fn inclusive_count(&self, target: usize) -> usize {
        (0..self.counts.len())
            .filter(|&ty| ty == target || self.descends_from(ty, target))
            .map(|ty| self.counts[ty])
            .sum()
    }
}

fn hierarchy() -> impl Strategy<Value = Hierarchy> {
    prop::collection::vec((any::<Option<Index>>(), 0usize..4), 1..9).prop_map(|specs| {
        let parents = specs
            .iter()
            .enumerate()
            .map(|(i, (parent, _))| {
                if i == 0 {
                    None
                } else {
                    parent.as_ref().map(|index| index.index(i))
                }
            })
            .collect();
        let counts = specs.iter().map(|(_, count)| *count).collect();
        Hierarchy { parents, counts }
    })
}

fn register(table: &TypeTable, hierarchy: &Hierarchy) -> Vec<TypeHandle> {
    let mut handles: Vec<TypeHandle> = Vec::with_capacity(hierarchy.parents.len());
    for (i, parent) in hierarchy.parents.iter().enumerate() {
        let ancestor = parent.map(|p| handles[p]);
        let handle = table
            .register_for::<u64>(&format!("Type{}", i), ancestor)
            .unwrap();
        handles.push(handle);
    }
    handles
}

fn spawn(handles: &[TypeHandle], hierarchy: &Hierarchy) -> Vec<TaggedBox<u64>> {
    hierarchy
        .counts
        .iter()
        .enumerate()
        .flat_map(|(ty, &count)| (0..count).map(move |k| (ty, k as u64)))
        .map(|(ty, k)| Tagged::boxed(handles[ty], k))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    #[cfg_attr(miri, ignore = "walks the live heap")]
    fn test_query_results_match_model(hierarchy in hierarchy()) {
        let table = TypeTable::new();
        let handles = register(&table, &hierarchy);
        let index: HashMap<TypeHandle, usize> =
            handles.iter().enumerate().map(|(i, &h)| (h, i)).collect();
        let _objects = spawn(&handles, &hierarchy);
        let beagle = Beagle::new(&table, &ALLOCATOR);

        for (target, &handle) in handles.iter().enumerate() {
            let inclusive = beagle.instances_of(handle).unwrap();
            let exact = beagle.exact_instances_of(handle).unwrap();

            for object in &inclusive {
                let ty = index[&object.type_handle];
                prop_assert!(ty == target || hierarchy.descends_from(ty, target));
            }
            prop_assert!(exact.iter().all(|object| object.type_handle == handle));
            prop_assert!(exact.len() <= inclusive.len());
            prop_assert_eq!(exact.len(), hierarchy.counts[target]);
            prop_assert_eq!(inclusive.len(), hierarchy.inclusive_count(target));

            let first = beagle.first_instance_of(handle).unwrap();
            prop_assert_eq!(first, inclusive.first().copied());
        }
    }

    #[test]
    fn test_subclasses_match_model(hierarchy in hierarchy()) {
        let table = TypeTable::new();
        let handles = register(&table, &hierarchy);
        let beagle = Beagle::new(&table, &ALLOCATOR);

        for (target, &handle) in handles.iter().enumerate() {
            let expected: Vec<TypeHandle> = (0..handles.len())
                .filter(|&ty| ty != target && hierarchy.descends_from(ty, target))
                .map(|ty| handles[ty])
                .collect();
            let subclasses = beagle.subclasses_of(handle);
            prop_assert!(!subclasses.contains(&handle));
            prop_assert_eq!(subclasses, expected);
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "walks the live heap")]
    fn test_hazards_only_with_opt_in(hierarchy in hierarchy(), pick in any::<Index>()) {
        let table = TypeTable::new();
        let handles = register(&table, &hierarchy);
        let hazard = handles[pick.index(handles.len())];
        let _objects = spawn(&handles, &hierarchy);
        let beagle = Beagle::new(&table, &ALLOCATOR).with_hazards(HazardSet::new([hazard]));
        let hazardous: HashSet<TypeHandle> = HashSet::from([hazard]);

        for (target, &handle) in handles.iter().enumerate() {
            let safe = beagle.instances_of(handle).unwrap();
            prop_assert!(safe.iter().all(|object| !hazardous.contains(&object.type_handle)));

            let all = beagle
                .find_instances(handle, FindOptions::INCLUDE_HAZARDOUS)
                .unwrap();
            prop_assert_eq!(all.len(), hierarchy.inclusive_count(target));
        }
    }
}
