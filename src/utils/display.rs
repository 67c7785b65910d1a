use crate::tools::ToolDescriptor;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

/// Print one descriptor with its arguments, required ones highlighted
pub fn print_tool(descriptor: &ToolDescriptor) {
    println!("{}", descriptor.name.yellow().bold());
    println!("  {}", descriptor.description);
    for (name, arg) in &descriptor.parameters.properties {
        let marker = if descriptor.parameters.is_required(name) {
            "required".red()
        } else {
            "optional".dimmed()
        };
        println!(
            "    {} ({}) [{}] {}",
            name.green(),
            arg.type_name(),
            marker,
            arg.description().unwrap_or("")
        );
    }
}
