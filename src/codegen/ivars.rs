//! The instance-value table: per-compilation pool of variable descriptors.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::path::VariablePath;
use crate::runtime::Variable;

/// Stable index of a descriptor within one compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorHandle(pub(crate) u32);

impl DescriptorHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DescriptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ivar#{}", self.0)
    }
}

/// Interns variable paths so each distinct path gets exactly one
/// descriptor, however many times the template references it.
///
/// Append-only while compiling; [`freeze`](Self::freeze) hands the
/// descriptors to the program, which shares them read-only across renders.
#[derive(Debug, Default)]
pub struct InstanceValues {
    descriptors: Vec<Variable>,
    index: FxHashMap<String, DescriptorHandle>,
}

impl InstanceValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `path`, creating its descriptor on first use.
    pub fn intern(&mut self, path: &VariablePath) -> DescriptorHandle {
        let key = path.key();
        if let Some(&handle) = self.index.get(&key) {
            return handle;
        }

        let handle = DescriptorHandle(self.descriptors.len() as u32);
        log::trace!("interned {handle} for `{key}`");
        self.descriptors.push(Variable::new(path.clone()));
        self.index.insert(key, handle);
        handle
    }

    /// Look up a previously interned path without creating one.
    pub fn get(&self, path: &VariablePath) -> Option<DescriptorHandle> {
        self.index.get(&path.key()).copied()
    }

    pub fn descriptor(&self, handle: DescriptorHandle) -> Option<&Variable> {
        self.descriptors.get(handle.index())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn freeze(self) -> Arc<[Variable]> {
        self.descriptors.into()
    }
}
