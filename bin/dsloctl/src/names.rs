//! ---
//! dslo_section: "05-operator-interfaces"
//! dslo_subsection: "binary"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Derived service name listing."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use anyhow::{bail, Result};
use clap::Args;
use dslo_naming::{derive, BindInfo, ServiceKind};

#[derive(Debug, Args)]
pub struct NamesCommand {
    /// Datasource resource name.
    resource: String,

    /// JNDI-style binding name, e.g. `java:/DS1`.
    binding: String,

    /// Also print the connection-property unit for each given property.
    #[arg(long = "property", value_name = "NAME")]
    properties: Vec<String>,
}

pub fn run(command: NamesCommand) -> Result<()> {
    if command.binding.trim().is_empty() {
        bail!("binding name for {} must not be empty", command.resource);
    }
    let names = derive(&command.resource, &command.binding);
    let bind = BindInfo::parse(&command.binding);

    println!("resource  {}", command.resource);
    println!(
        "binding   {} (context {}, bound as {})",
        command.binding,
        bind.context.service_name(),
        bind.bind_name
    );
    for (kind, name) in names.fixed() {
        println!("{:<34} {}", kind.label(), name);
    }
    for property in &command.properties {
        println!(
            "{:<34} {}",
            ServiceKind::ConnectionProperty.label(),
            names.connection_property(property)
        );
    }
    Ok(())
}
