use anyhow::{Context, Result};
use heap_beagle::config::{load_config, validate_config};
use heap_beagle::logging::init_logging;
use heap_beagle::{
    Address, Beagle, ObjectHandle, Tagged, TrackingAllocator, TypeRegistry, TypeTable,
};
use serde::Serialize;
use tracing::info;

#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();

const PLACEHOLDER: &str = "PlaceholderAnimal";

#[derive(Debug)]
struct Animal {
    name: &'static str,
    legs: u32,
}

#[derive(Serialize)]
struct InstanceReport {
    address: String,
    type_name: Option<String>,
    hazardous: bool,
}

#[derive(Serialize)]
struct QueryReport {
    query: String,
    instances: Vec<InstanceReport>,
    exact_instances: usize,
    first_instance: Option<String>,
    subclasses: Vec<String>,
    inspected_address: Option<String>,
    inspected: Option<InstanceReport>,
    live_blocks: usize,
    untracked_blocks: usize,
    overflow_shards: usize,
}

fn describe_one(table: &TypeTable, handle: &ObjectHandle) -> InstanceReport {
    InstanceReport {
        address: handle.address.to_string(),
        type_name: table.name_of(handle.type_handle),
        hazardous: handle.hazardous,
    }
}

fn describe(table: &TypeTable, handles: &[ObjectHandle]) -> Vec<InstanceReport> {
    handles
        .iter()
        .map(|handle| describe_one(table, handle))
        .collect()
}

fn main() -> Result<()> {
    let mut config = load_config().context("loading beagle.toml")?;
    validate_config(&config).context("validating configuration")?;
    init_logging(&config.logging)?;

    info!("Starting heap-beagle v{}", env!("CARGO_PKG_VERSION"));
    // heap-beagle [TYPE] [ADDRESS]
    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(|| "Animal".to_string());
    let address_arg = args.next();

    let table = TypeTable::new();
    let animal = table.register_for::<Animal>("Animal", None)?;
    let dog = table.register_for::<Animal>("Dog", Some(animal))?;
    let cat = table.register_for::<Animal>("Cat", Some(animal))?;
    let placeholder = table.register_for::<Animal>(PLACEHOLDER, Some(animal))?;

    if !config.hazards.types.iter().any(|name| name == PLACEHOLDER) {
        config.hazards.types.push(PLACEHOLDER.to_string());
    }

    let pets = vec![
        Tagged::boxed(dog, Animal { name: "Rex", legs: 4 }),
        Tagged::boxed(dog, Animal { name: "Fido", legs: 4 }),
        Tagged::boxed(cat, Animal { name: "Tom", legs: 4 }),
        Tagged::boxed(placeholder, Animal { name: "?", legs: 0 }),
    ];
    info!(
        "Allocated {} demonstration objects ({})",
        pets.len(),
        pets.iter().map(|pet| pet.name).collect::<Vec<_>>().join(", ")
    );

    let beagle = Beagle::from_config(&config, &table, &ALLOCATOR)?;

    let instances = beagle.instances_named(&query)?;
    let exact_instances = beagle.exact_instances_named(&query)?.len();
    let first_instance = beagle
        .first_instance_named(&query)?
        .map(|handle| handle.address.to_string());
    let subclasses = beagle
        .subclasses_named(&query)
        .into_iter()
        .filter_map(|ty| beagle.type_name(ty))
        .collect();

    // Identify the given address, or re-identify the first hit by its printed form
    let inspected_address = address_arg.or_else(|| first_instance.clone());
    let inspected = match &inspected_address {
        Some(text) => {
            let address: Address = text
                .parse()
                .with_context(|| format!("parsing address {text}"))?;
            beagle.object_at(address)?
        }
        None => None,
    };

    info!(
        "Found {} instances of {} ({} with four legs)",
        instances.len(),
        query,
        pets.iter().filter(|pet| pet.legs == 4).count()
    );

    let stats = ALLOCATOR.stats();
    let report = QueryReport {
        query,
        instances: describe(&table, &instances),
        exact_instances,
        first_instance,
        subclasses,
        inspected_address,
        inspected: inspected.map(|handle| describe_one(&table, &handle)),
        live_blocks: stats.live_blocks,
        untracked_blocks: stats.untracked_blocks,
        overflow_shards: stats.overflow_shards,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    drop(pets);
    Ok(())
}
