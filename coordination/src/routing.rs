//! Task-type to agent-category routing configuration.

use std::collections::HashMap;

use common::AgentCategory;

/// Maps task-type names to the category responsible for them.
///
/// The table is plain data handed to the coordinator at construction, so new
/// task types are configuration rather than code changes. Lookups on
/// unmapped names fail closed.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<String, AgentCategory>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The task types understood by the stock agent fleet.
    pub fn standard() -> Self {
        use AgentCategory::*;
        [
            ("collect_data", Collector),
            ("collect_market_data", Collector),
            ("web_scraping", Collector),
            ("api_integration", Collector),
            ("analyze_data", Analyzer),
            ("trend_analysis", Analyzer),
            ("pattern_recognition", Analyzer),
            ("anomaly_detection", Analyzer),
            ("statistical_analysis", Analyzer),
            ("generate_insights", InsightGenerator),
            ("business_intelligence", InsightGenerator),
            ("create_recommendations", InsightGenerator),
            ("execute_action", ActionExecutor),
            ("report_generation", ActionExecutor),
            ("notification", ActionExecutor),
        ]
        .into_iter()
        .collect()
    }

    pub fn insert(&mut self, task_type: impl Into<String>, category: AgentCategory) {
        self.routes.insert(task_type.into(), category);
    }

    pub fn resolve(&self, task_type: &str) -> Option<AgentCategory> {
        self.routes.get(task_type).copied()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.routes.contains_key(task_type)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, AgentCategory)> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = (S, AgentCategory)>>(iter: I) -> Self {
        Self {
            routes: iter
                .into_iter()
                .map(|(name, category)| (name.into(), category))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_resolves_known_types() {
        let table = RoutingTable::standard();
        assert_eq!(table.resolve("collect_data"), Some(AgentCategory::Collector));
        assert_eq!(table.resolve("statistical_analysis"), Some(AgentCategory::Analyzer));
        assert_eq!(
            table.resolve("generate_insights"),
            Some(AgentCategory::InsightGenerator)
        );
        assert_eq!(table.resolve("notification"), Some(AgentCategory::ActionExecutor));
    }

    #[test]
    fn test_unmapped_type_fails_closed() {
        let table = RoutingTable::standard();
        assert_eq!(table.resolve("summon_demons"), None);
    }

    #[test]
    fn test_from_iterator() {
        let table: RoutingTable =
            [("custom_scan", AgentCategory::Collector)].into_iter().collect();
        assert_eq!(table.len(), 1);
        assert!(table.contains("custom_scan"));
    }
}
