use crate::authz::{descriptor_for, Capability, PermissionDescriptor, Resource, Role};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

pub fn handle(role: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let descriptor = descriptor_for(role);

    match output_format {
        OutputFormat::Text => print_table(&descriptor),
        _ => output_value(&output_format, &descriptor)?,
    }
    Ok(())
}

fn flag(descriptor: &PermissionDescriptor, resource: Resource, capability: Capability) -> &'static str {
    if descriptor.get(resource).allows(capability) {
        "yes"
    } else {
        "-"
    }
}

fn print_table(descriptor: &PermissionDescriptor) {
    println!("Permissions for {}", descriptor.role);
    println!("{:<18} {:<6} {:<7} {:<7} {:<7} {}", "RESOURCE", "READ", "CREATE", "UPDATE", "DELETE", "ROW SCOPE");
    println!("{}", "-".repeat(80));

    for resource in Resource::ALL {
        let scope = serde_json::to_value(descriptor.get(resource).row_scope)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let name = serde_json::to_value(resource)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!(
            "{:<18} {:<6} {:<7} {:<7} {:<7} {}",
            name,
            flag(descriptor, resource, Capability::Read),
            flag(descriptor, resource, Capability::Create),
            flag(descriptor, resource, Capability::Update),
            flag(descriptor, resource, Capability::Delete),
            scope
        );
    }
}
