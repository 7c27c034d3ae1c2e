//! `nodeshadow view`: build and display the operator view of a node.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use nodeshadow::config::OutputFormat;
use nodeshadow::{AppStats, Node, NodeView, ReportView};

use super::{print_json, read_document};

pub fn run(path: &Path, timeout: Duration, format: OutputFormat) -> Result<()> {
    let mut node: Node = read_document(path)?;
    let view = node
        .view(timeout)
        .with_context(|| format!("building view of {}", path.display()))?;

    match format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Table => {
            print_table(&view);
            Ok(())
        }
    }
}

fn fmt_bytes(raw: &str) -> String {
    let Ok(bytes) = raw.parse::<u64>() else {
        return raw.to_string();
    };
    if bytes >= 1_099_511_627_776 {
        format!("{:.1} TB", bytes as f64 / 1_099_511_627_776.0)
    } else if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

fn fmt_cores(raw: &str) -> String {
    match raw.parse::<u64>() {
        Ok(millis) => format!("{:.2}", millis as f64 / 1000.0),
        Err(_) => raw.to_string(),
    }
}

fn fmt_percent(raw: Option<&String>) -> String {
    let pct = raw.and_then(|p| p.parse::<f64>().ok()).unwrap_or(0.0) * 100.0;
    if pct > 90.0 {
        format!("{:.0}%", pct).red().to_string()
    } else if pct > 75.0 {
        format!("{:.0}%", pct).yellow().to_string()
    } else {
        format!("{:.0}%", pct)
    }
}

fn print_table(view: &NodeView) {
    println!("{}", "═══ Node View ═══".cyan().bold());
    println!("  Name:          {}", view.name.bold());
    if !view.namespace.is_empty() {
        println!("  Namespace:     {}", view.namespace);
    }
    if !view.version.is_empty() {
        println!("  Version:       {}", view.version);
    }
    if let Some(mode) = &view.mode {
        println!("  Mode:          {}", mode);
    }
    println!("  Cluster:       {}", if view.cluster { "yes" } else { "no" });
    println!(
        "  Ready:         {}",
        if view.ready {
            "yes".green()
        } else {
            "no".red()
        }
    );
    if !view.accelerator.is_empty() {
        println!("  Accelerator:   {}", view.accelerator);
    }

    let Some(report) = view.report.as_ref() else {
        println!();
        println!("  {}", "no report received".dimmed());
        return;
    };
    if let Some(time) = report.time {
        println!("  Reported:      {}", time.to_rfc3339());
    }

    print_sub_nodes(report);
    print_apps("── Apps ──", &report.app_stats);
    print_apps("── System Apps ──", &report.sys_app_stats);
}

fn print_sub_nodes(report: &ReportView) {
    let mut hostnames: Vec<&String> = report.node.keys().chain(report.node_stats.keys()).collect();
    hostnames.sort();
    hostnames.dedup();
    if hostnames.is_empty() {
        return;
    }

    println!();
    println!("{}", "── Nodes ──".yellow());
    for hostname in hostnames {
        let mut header = format!("  {}", hostname.bold());
        if let Some(info) = report.node.get(hostname) {
            if !info.role.is_empty() {
                header.push_str(&format!(" [{}]", info.role));
            }
            if !info.os.is_empty() || !info.arch.is_empty() {
                header.push_str(&format!(" {}/{}", info.os, info.arch));
            }
        }
        let instances = report.node_instance_count.get(hostname).copied().unwrap_or(0);
        header.push_str(&format!(", {} instance(s)", instances));
        println!("{}", header);

        let Some(stats) = report.node_stats.get(hostname) else {
            continue;
        };
        if let (Some(used), Some(total)) = (stats.usage.get("cpu"), stats.capacity.get("cpu")) {
            println!(
                "    CPU:     {} / {} cores  {}",
                fmt_cores(used),
                fmt_cores(total),
                fmt_percent(stats.percent.get("cpu"))
            );
        }
        if let (Some(used), Some(total)) = (stats.usage.get("memory"), stats.capacity.get("memory"))
        {
            println!(
                "    Memory:  {} / {}  {}",
                fmt_bytes(used),
                fmt_bytes(total),
                fmt_percent(stats.percent.get("memory"))
            );
        }
        if stats.percent.contains_key("gpu") {
            println!(
                "    GPU:     {} / {}  {}",
                stats.usage.get("gpu").map(String::as_str).unwrap_or("-"),
                stats.capacity.get("gpu").map(String::as_str).unwrap_or("-"),
                fmt_percent(stats.percent.get("gpu"))
            );
        }
    }
}

fn print_apps(title: &str, apps: &[AppStats]) {
    if apps.is_empty() {
        return;
    }
    println!();
    println!("{}", title.yellow());
    for app in apps {
        let status = if app.status.is_empty() {
            "unknown".dimmed().to_string()
        } else if app.status == "Running" {
            app.status.green().to_string()
        } else {
            app.status.red().to_string()
        };
        println!(
            "  {} {} {} ({} instance(s))",
            app.name,
            app.version.dimmed(),
            status,
            app.instances.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_formatting() {
        assert_eq!(fmt_bytes("512"), "512 B");
        assert_eq!(fmt_bytes("1073741824"), "1.0 GB");
        assert_eq!(fmt_bytes("n/a"), "n/a");
    }

    #[test]
    fn core_formatting() {
        assert_eq!(fmt_cores("1500"), "1.50");
    }
}
