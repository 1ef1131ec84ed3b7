use colored::*;
use rpcbridge_core::{
    Registry,
    descriptor::{FieldPath, File},
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// The generation targets of a loaded registry.
pub struct RegistrySummary<'a>(pub &'a Registry);

/// A resolved field path, rooted at the named message.
pub struct ResolvedPath<'a>(pub &'a str, pub &'a FieldPath);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        let mut out = format!("{} {}", "Error:".red().bold(), err);
        for cause in err.chain().skip(1) {
            out.push_str(&format!("\n  {} {}", "caused by:".yellow(), cause));
        }
        FormattedString(out)
    }
}

impl From<RegistrySummary<'_>> for FormattedString {
    fn from(RegistrySummary(registry): RegistrySummary<'_>) -> Self {
        let files: Vec<&File> = registry
            .files_to_generate()
            .filter(|f| !f.services.is_empty())
            .collect();

        if files.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        for file in files {
            out.push_str(&format!(
                "{} {} ({} {})\n",
                "file".cyan(),
                file.name().bold(),
                "package".cyan(),
                file.package.identifier()
            ));

            for service in &file.services {
                out.push_str(&format!("  {} {} {{\n", "service".cyan(), service.full_name().green()));
                for method in &service.methods {
                    let streaming = if method.is_streaming() {
                        " (streaming, not proxied)".dimmed().to_string()
                    } else {
                        String::new()
                    };
                    out.push_str(&format!(
                        "    {} {}({}) returns ({}){}\n",
                        "rpc".cyan(),
                        method.jsonrpc_name().yellow(),
                        method.request_type,
                        method.response_type,
                        streaming
                    ));
                }
                out.push_str("  }\n");
            }
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<ResolvedPath<'_>> for FormattedString {
    fn from(ResolvedPath(root, path): ResolvedPath<'_>) -> Self {
        if path.is_empty() {
            return FormattedString(format!("{} (whole message)", root.green()));
        }

        let mut out = format!("{}\n", root.green());
        for (depth, component) in path.iter().enumerate() {
            let target = &component.target;
            let type_name = match target.type_name() {
                "" => format!("{:?}", target.field_type()).to_lowercase(),
                name => name.to_string(),
            };
            out.push_str(&format!(
                "{}{} {} = {}\n",
                "  ".repeat(depth + 1),
                type_name.cyan(),
                component.name.yellow(),
                target.proto.number()
            ));
        }
        FormattedString(out.trim_end().to_string())
    }
}
