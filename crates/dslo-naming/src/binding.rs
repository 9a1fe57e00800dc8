//! ---
//! dslo_section: "02-service-naming"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Binding name parsing into naming contexts."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use crate::name::ServiceName;
use crate::resolver::ROOT;

const JAVA_PREFIX: &str = "java:";

/// Naming context a binding name resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingContext {
    /// `java:` (and `java:/`) names.
    Java,
    /// `java:jboss/` names.
    Jboss,
    /// `java:jboss/exported/` names.
    JbossExported,
    /// `java:global/` names.
    Global,
}

impl NamingContext {
    /// Service name of the context itself; binders live directly below it.
    pub fn service_name(&self) -> ServiceName {
        let java = ServiceName::of([ROOT, "naming", "context", "java"]);
        match self {
            NamingContext::Java => java,
            NamingContext::Jboss => java.append("jboss"),
            NamingContext::JbossExported => java.append("jboss").append("exported"),
            NamingContext::Global => java.append("global"),
        }
    }
}

/// Result of splitting a binding name into its context and relative name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindInfo {
    /// Context the name is bound into.
    pub context: NamingContext,
    /// Name relative to the context; a single service name segment.
    pub bind_name: String,
}

impl BindInfo {
    /// Parse a binding name such as `java:/DS1` or `java:jboss/datasources/Example`.
    ///
    /// Never fails: unknown shapes fall back to the plain `java` context.
    pub fn parse(binding_name: &str) -> Self {
        let name = binding_name
            .strip_prefix(JAVA_PREFIX)
            .unwrap_or(binding_name);
        let (context, bind_name) = if let Some(rest) = name.strip_prefix("jboss/exported/") {
            (NamingContext::JbossExported, rest)
        } else if let Some(rest) = name.strip_prefix("jboss/") {
            (NamingContext::Jboss, rest)
        } else if let Some(rest) = name.strip_prefix("global/") {
            (NamingContext::Global, rest)
        } else if let Some(rest) = name.strip_prefix('/') {
            (NamingContext::Java, rest)
        } else {
            (NamingContext::Java, name)
        };
        Self {
            context,
            bind_name: bind_name.to_owned(),
        }
    }

    /// Name of the binder unit publishing this binding.
    pub fn binder_service_name(&self) -> ServiceName {
        self.context.service_name().append(self.bind_name.clone())
    }
}
