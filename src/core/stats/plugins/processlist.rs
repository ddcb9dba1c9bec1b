use serde::Serialize;

use crate::core::processes::{flatten_tree, format_tree_indent, ProcessRecord};
use crate::core::stats::plugin::{FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("pid", "Process identifier", "number"),
    FieldDescription::new("ppid", "Parent process identifier", "number"),
    FieldDescription::new("name", "Process name", "string"),
    FieldDescription::new("cmdline", "Command line with arguments", "list"),
    FieldDescription::new("username", "Process owner", "string"),
    FieldDescription::new("status", "Process status", "string"),
    FieldDescription::new("cpu_percent", "Process CPU consumption", "percent"),
    FieldDescription::new("memory_percent", "Process memory consumption", "percent"),
    FieldDescription::new("memory_info", "Resident and virtual memory", "bytes"),
    FieldDescription::new("io_counters", "Process disk I/O and rates", "bytes"),
    FieldDescription::new("nice", "Process nice value", "number"),
    FieldDescription::new("num_threads", "Number of threads", "number"),
    FieldDescription::new("cpu_times", "User and system CPU time", "seconds"),
];

#[derive(Serialize)]
struct ProcessItem<'a> {
    #[serde(flatten)]
    process: &'a ProcessRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree_prefix: Option<String>,
}

/// Sorted process list, or the flattened process tree in tree mode.
#[derive(Default)]
pub struct ProcessListPlugin {
    export: PluginSnapshot,
}

impl Plugin for ProcessListPlugin {
    fn name(&self) -> &'static str {
        "processlist"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("pid")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn needs_processes(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let collector = &*ctx.processes;
        self.export = PluginSnapshot::list(collector.export_list())?;

        let Some(tree) = collector.tree() else {
            let items: Vec<ProcessItem<'_>> = collector
                .processes()
                .iter()
                .map(|process| ProcessItem {
                    process,
                    depth: None,
                    tree_prefix: None,
                })
                .collect();
            return PluginSnapshot::list(&items);
        };

        let flattened = flatten_tree(tree);
        let limit = collector.max_processes().unwrap_or(flattened.len());
        let items: Vec<ProcessItem<'_>> = flattened
            .iter()
            .take(limit)
            .map(|node| ProcessItem {
                process: &node.process,
                depth: Some(node.depth),
                tree_prefix: Some(format_tree_indent(node)),
            })
            .collect();
        PluginSnapshot::list(&items)
    }

    fn export(&self, _snapshot: &PluginSnapshot) -> PluginSnapshot {
        self.export.clone()
    }

    fn empty(&self) -> PluginSnapshot {
        PluginSnapshot::empty_list()
    }
}
