//! How the handler is addressed and what runtime it reports.

use apistack_core::declare::{ComputeDeclaration, RuntimeKind};

/// Supplies the runtime version quoted in greetings.
pub trait VersionProvider: Send + Sync {
    fn runtime_version(&self) -> String;
}

/// A fixed version string.
#[derive(Debug, Clone)]
pub struct StaticVersion(pub String);

impl StaticVersion {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }
}

impl VersionProvider for StaticVersion {
    fn runtime_version(&self) -> String {
        self.0.clone()
    }
}

/// The version of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageVersion;

impl VersionProvider for PackageVersion {
    fn runtime_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Where a gateway integration sends events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerAddress {
    pub runtime: RuntimeKind,
    /// `<file>.<export>`, e.g. `app.handler`.
    pub entry_point: String,
    pub layers: Vec<String>,
}

impl HandlerAddress {
    pub fn from_declaration(decl: &ComputeDeclaration) -> Self {
        Self {
            runtime: decl.runtime,
            entry_point: decl.handler.clone(),
            layers: decl.layers.iter().map(|l| l.logical_id.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apistack_core::declare::StackDeclaration;

    #[test]
    fn address_from_demo() {
        let a = HandlerAddress::from_declaration(&StackDeclaration::demo().compute);
        assert_eq!(a.runtime, RuntimeKind::Provided);
        assert_eq!(a.entry_point, "app.handler");
        assert_eq!(a.layers, vec!["deno-layer".to_string()]);
    }
}
