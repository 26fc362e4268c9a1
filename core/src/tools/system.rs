//! System information tool

use super::{JsonMap, Tool, ToolSchema};
use async_trait::async_trait;
use sysinfo::{Disks, System};

/// Tool reporting OS, CPU, memory, and disk statistics for the sandbox.
pub struct GetSystemInfoTool;

impl GetSystemInfoTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetSystemInfoTool {
    fn default() -> Self {
        Self::new()
    }
}

fn format_mb(bytes: u64) -> String {
    format!("{} MB", bytes / 1024 / 1024)
}

#[async_trait]
impl Tool for GetSystemInfoTool {
    fn name(&self) -> &'static str {
        "get_system_info"
    }

    fn description(&self) -> &'static str {
        "Report operating system, CPU, memory, and disk statistics"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description())
    }

    async fn invoke(&self, _args: &JsonMap) -> Result<String, String> {
        let mut sys = System::new_all();
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        let os = format!(
            "{} {}",
            System::name().unwrap_or_else(|| "unknown".to_string()),
            System::os_version().unwrap_or_default()
        );
        let host = System::host_name().unwrap_or_else(|| "unknown".to_string());
        let kernel = System::kernel_version().unwrap_or_else(|| "unknown".to_string());

        let mut report = String::new();
        report.push_str(&format!("OS: {}\n", os.trim()));
        report.push_str(&format!("Host: {}\n", host));
        report.push_str(&format!(
            "Runtime: warden-core {} (kernel {})\n",
            env!("CARGO_PKG_VERSION"),
            kernel
        ));
        report.push_str(&format!("CPU cores: {}\n", sys.cpus().len()));
        report.push_str(&format!(
            "Memory: {} used / {} total\n",
            format_mb(sys.used_memory()),
            format_mb(sys.total_memory())
        ));

        let disks = Disks::new_with_refreshed_list();
        for disk in disks.list() {
            report.push_str(&format!(
                "Disk {}: {} free / {} total\n",
                disk.mount_point().display(),
                format_mb(disk.available_space()),
                format_mb(disk.total_space())
            ));
        }
        if disks.list().is_empty() {
            report.push_str("Disk: (no mounts visible)\n");
        }

        Ok(report)
    }
}
