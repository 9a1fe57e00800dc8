//! ---
//! dslo_section: "02-service-naming"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Dependent service name derivation."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Service naming for datasource resources.
//!
//! Every runtime unit that backs a datasource is addressed by a hierarchical
//! [`ServiceName`]. The names are a pure function of the resource name and its
//! binding name, so they can be re-derived at any point (teardown, rollback)
//! and always land on the same units.
#![warn(missing_docs)]

mod binding;
mod name;
mod resolver;

pub use binding::{BindInfo, NamingContext};
pub use name::ServiceName;
pub use resolver::{
    capability_service_name, derive, is_descendant_of, DependentServiceNames,
    ResourceServiceNames, ServiceKind, CONNECTION_PROPERTIES, DATA_SOURCE_CAPABILITY, STATISTICS,
    XA_DATASOURCE_PROPERTIES,
};
