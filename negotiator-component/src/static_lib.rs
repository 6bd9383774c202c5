use anyhow::anyhow;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::component::SkepticismGate;

pub type ConstructorFunction = Box<
    dyn Fn(&str, serde_yaml::Value) -> anyhow::Result<Box<dyn SkepticismGate>> + Send + Sync,
>;

lazy_static! {
    /// Contains functions that can create skepticism gates by name.
    static ref CONSTRUCTORS: Arc<Mutex<HashMap<String, ConstructorFunction>>> = Arc::new(Mutex::new(HashMap::new()));
}

/// Gate that can be constructed from its yaml parameters.
pub trait GateFactory: SkepticismGate + Sized + 'static {
    fn new(name: &str, params: serde_yaml::Value) -> anyhow::Result<Self>;
}

pub fn factory<G: GateFactory>() -> ConstructorFunction {
    Box::new(|name, params| Ok(Box::new(G::new(name, params)?) as Box<dyn SkepticismGate>))
}

/// Makes a gate available to configs as `library::name`.
pub fn register_gate(
    library: &str,
    name: &str,
    constructor: ConstructorFunction,
) -> anyhow::Result<()> {
    (*CONSTRUCTORS)
        .lock()
        .map_err(|e| anyhow!("Failed to acquire static gate registration lock: {}", e))?
        .insert(format!("{}::{}", library, name), constructor);
    Ok(())
}

pub fn create_static_gate(
    name_path: &str,
    params: serde_yaml::Value,
) -> anyhow::Result<Box<dyn SkepticismGate>> {
    let map = (*CONSTRUCTORS)
        .lock()
        .map_err(|e| anyhow!("Failed to acquire static gate creation lock: {}", e))?;

    match map.get(name_path) {
        Some(constructor) => constructor(name_path, params),
        None => Err(anyhow!("Skepticism gate '{}' not found.", name_path)),
    }
}
