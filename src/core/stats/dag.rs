//! Plugin update ordering.

use std::collections::{BTreeMap, HashSet};

/// Plugin name to the plugins it reads from, plus dependencies every plugin
/// has.
#[derive(Debug, Clone, Default)]
pub struct PluginGraph {
    edges: BTreeMap<String, Vec<String>>,
    global: Vec<String>,
}

impl PluginGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, plugin: &str, depends_on: &[&str]) {
        let deps = self.edges.entry(plugin.to_string()).or_default();
        for dep in depends_on {
            if !deps.iter().any(|d| d == dep) {
                deps.push(dep.to_string());
            }
        }
    }

    pub fn add_global(&mut self, dependency: &str) {
        if !self.global.iter().any(|d| d == dependency) {
            self.global.push(dependency.to_string());
        }
    }

    pub fn dependencies(&self, plugin: &str) -> &[String] {
        self.edges.get(plugin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn global(&self) -> &[String] {
        &self.global
    }

    /// Transitive dependencies of `plugin` in depth-first post-order, then
    /// the global dependencies, then the plugin itself. No duplicates; cycles
    /// are cut at the first revisit.
    pub fn resolve(&self, plugin: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        visited.insert(plugin.to_string());

        for dep in self.dependencies(plugin) {
            self.visit(dep, &mut visited, &mut order);
        }
        for dep in &self.global {
            self.visit(dep, &mut visited, &mut order);
        }
        order.push(plugin.to_string());
        order
    }

    fn visit(&self, plugin: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(plugin.to_string()) {
            return;
        }
        for dep in self.dependencies(plugin) {
            self.visit(dep, visited, order);
        }
        order.push(plugin.to_string());
    }

    /// Update order covering `plugins`, dependencies first. Names outside
    /// `plugins` are left out.
    pub fn update_order<'a>(&self, plugins: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let plugins: Vec<&str> = plugins.into_iter().collect();
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            for name in self.resolve(plugin) {
                if plugins.contains(&name.as_str()) && seen.insert(name.clone()) {
                    order.push(name);
                }
            }
        }
        order
    }
}

/// Dependencies between the built-in plugins
pub fn default_graph() -> PluginGraph {
    let mut graph = PluginGraph::new();
    graph.add_dependency("cpu", &["core"]);
    graph.add_dependency("load", &["core"]);
    graph.add_dependency("processlist", &["core", "processcount"]);
    graph.add_dependency("programlist", &["processcount"]);
    graph.add_dependency("quicklook", &["fs", "load"]);
    graph.add_global("alert");
    graph
}
