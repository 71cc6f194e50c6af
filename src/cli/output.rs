//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{GpuClocks, GpuUsage, OverclockProfile};
use crate::gpu::StagedChange;
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// `value` with `unit`, or `N/A` for the `-1` sentinel
fn reading(value: f32, unit: &str) -> String {
    if value < 0.0 {
        "N/A".to_string()
    } else {
        format!("{:.0}{}", value, unit)
    }
}

/// GPU list entry for display
#[derive(Debug, Clone, Serialize)]
pub struct GpuListEntry {
    pub index: usize,
    pub gpu_id: u32,
    pub name: String,
}

impl TableDisplay for GpuListEntry {
    fn to_table(&self) -> String {
        format!("[{}] {} (ID: {:#x})", self.index, self.name, self.gpu_id)
    }

    fn to_compact(&self) -> String {
        format!("{}:{}", self.index, self.name)
    }
}

/// GPU list for display
#[derive(Debug, Clone, Serialize)]
pub struct GpuList {
    pub gpus: Vec<GpuListEntry>,
    pub interface_version: String,
}

impl TableDisplay for GpuList {
    fn to_table(&self) -> String {
        let mut output = format!("NVAPI: {}\n", self.interface_version);
        output.push_str(&format!("GPUs Found: {}\n\n", self.gpus.len()));

        for gpu in &self.gpus {
            output.push_str(&gpu.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.gpus
            .iter()
            .map(|g| g.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summary of one GPU
#[derive(Debug, Clone, Serialize)]
pub struct GpuInfoOutput {
    pub gpu_index: usize,
    pub gpu_id: u32,
    pub name: String,
    pub serial_number: Option<String>,
    pub voltage_mv: f32,
    pub temperature_c: f32,
    pub clocks: GpuClocks,
}

impl TableDisplay for GpuInfoOutput {
    fn to_table(&self) -> String {
        format!(
            "[{}] {}\n  GPU ID: {:#x}\n  Serial: {}\n  Voltage: {}\n  Temperature: {}\n  Clocks: {}",
            self.gpu_index,
            self.name,
            self.gpu_id,
            self.serial_number.as_deref().unwrap_or("N/A"),
            reading(self.voltage_mv, " mV"),
            reading(self.temperature_c, "°C"),
            self.clocks
        )
    }
}

/// Clock table for display
#[derive(Debug, Clone, Serialize)]
pub struct ClocksOutput {
    pub gpu_index: usize,
    pub kind: String,
    pub clocks: GpuClocks,
}

impl TableDisplay for ClocksOutput {
    fn to_table(&self) -> String {
        format!(
            "[{}] {} clocks\n  Core: {}\n  Memory: {}\n  Shader: {}",
            self.gpu_index,
            self.kind,
            reading(self.clocks.core, " MHz"),
            reading(self.clocks.memory, " MHz"),
            reading(self.clocks.shader, " MHz")
        )
    }

    fn to_compact(&self) -> String {
        format!("GPU {} {}: {}", self.gpu_index, self.kind, self.clocks)
    }
}

/// Utilization for display
#[derive(Debug, Clone, Serialize)]
pub struct UsageOutput {
    pub gpu_index: usize,
    pub usage: GpuUsage,
}

impl TableDisplay for UsageOutput {
    fn to_table(&self) -> String {
        format!(
            "[{}] Utilization\n  Core: {}\n  Frame Buffer: {}\n  Video: {}\n  Bus: {}",
            self.gpu_index,
            reading(self.usage.core, "%"),
            reading(self.usage.frame_buffer, "%"),
            reading(self.usage.video, "%"),
            reading(self.usage.bus, "%")
        )
    }
}

/// Overclock profile for display
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutput {
    pub gpu_index: usize,
    pub profile: OverclockProfile,
}

impl TableDisplay for ProfileOutput {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] Overclock profile\n", self.gpu_index);
        output.push_str("  Setting          Current     Range                 Editable\n");
        output.push_str("  ──────────────────────────────────────────────────────────\n");

        for (area, setting) in self.profile.iter() {
            let unit = area.unit();
            output.push_str(&format!(
                "  {:<16} {:<11} {:<21} {}\n",
                area.to_string(),
                format!("{:.0} {}", setting.current, unit),
                format!("{:.0} to {:.0} {}", setting.min, setting.max, unit),
                if setting.editable { "yes" } else { "no" }
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        let editable: Vec<String> = self
            .profile
            .iter()
            .filter(|(_, s)| s.editable)
            .map(|(area, s)| format!("{}={:.0}{}", area, s.current, area.unit()))
            .collect();
        format!("GPU {}: {}", self.gpu_index, editable.join(", "))
    }
}

/// Staged overclock for display
#[derive(Debug, Clone, Serialize)]
pub struct OverclockOutput {
    pub gpu_index: usize,
    pub dry_run: bool,
    pub changes: Vec<StagedChange>,
}

impl TableDisplay for OverclockOutput {
    fn to_table(&self) -> String {
        let verb = if self.dry_run { "Would apply" } else { "Applied" };
        let mut output = format!("[{}] {} {} change(s)\n", self.gpu_index, verb, self.changes.len());

        for change in &self.changes {
            output.push_str(&format!(
                "  {} = {} {} (raw {} on target {} via {})\n",
                change.area,
                change.value,
                change.area.unit(),
                change.raw,
                change.target,
                change.call
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        let changes: Vec<String> = self
            .changes
            .iter()
            .map(|c| format!("{}={}{}", c.area, c.value, c.area.unit()))
            .collect();
        format!("GPU {}: {}", self.gpu_index, changes.join(", "))
    }
}

/// One reading of the watch loop
#[derive(Debug, Clone, Serialize)]
pub struct WatchSample {
    pub gpu_index: usize,
    pub clocks: GpuClocks,
    pub usage: GpuUsage,
    pub temperature_c: f32,
    pub voltage_mv: f32,
}

impl TableDisplay for WatchSample {
    fn to_table(&self) -> String {
        format!(
            "[{}] core {} mem {} | load {} | {} | {}",
            self.gpu_index,
            reading(self.clocks.core, " MHz"),
            reading(self.clocks.memory, " MHz"),
            reading(self.usage.core, "%"),
            reading(self.temperature_c, "°C"),
            reading(self.voltage_mv, " mV")
        )
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
