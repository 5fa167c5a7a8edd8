//! Styling request model

use super::Category;
use crate::error::{Result, TizzlError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Default number of products returned per request
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Free-text styling request plus structured constraints.
///
/// Built once per retrieval call and never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub preferred_categories: Vec<Category>,
    #[serde(default)]
    pub excluded_categories: Vec<Category>,
    #[serde(default)]
    pub preferred_colors: BTreeSet<String>,
    #[serde(default)]
    pub size_constraints: BTreeMap<Category, String>,
    #[serde(default = "default_include_sale_items")]
    pub include_sale_items: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

fn default_include_sale_items() -> bool {
    true
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl StyleRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            occasion: None,
            budget: None,
            preferred_categories: Vec::new(),
            excluded_categories: Vec::new(),
            preferred_colors: BTreeSet::new(),
            size_constraints: BTreeMap::new(),
            include_sale_items: true,
            max_results: DEFAULT_MAX_RESULTS,
            conversation_id: None,
            context: HashMap::new(),
        }
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn prefer_category(mut self, category: Category) -> Self {
        if !self.preferred_categories.contains(&category) {
            self.preferred_categories.push(category);
        }
        self
    }

    pub fn exclude_category(mut self, category: Category) -> Self {
        if !self.excluded_categories.contains(&category) {
            self.excluded_categories.push(category);
        }
        self
    }

    pub fn prefer_color(mut self, color: impl Into<String>) -> Self {
        self.preferred_colors.insert(color.into().to_lowercase());
        self
    }

    pub fn with_size(mut self, category: Category, size: impl Into<String>) -> Self {
        self.size_constraints.insert(category, size.into());
        self
    }

    pub fn include_sale_items(mut self, include: bool) -> Self {
        self.include_sale_items = include;
        self
    }

    /// Reject malformed input before any provider is contacted
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(TizzlError::InvalidRequest("query must not be empty".into()));
        }
        if self.max_results == 0 {
            return Err(TizzlError::InvalidRequest(
                "max_results must be positive".into(),
            ));
        }
        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(TizzlError::InvalidRequest(format!(
                    "budget must be a positive number, got {}",
                    budget
                )));
            }
        }
        Ok(())
    }

    /// Stable key covering every field that influences the result
    pub fn cache_key(&self) -> String {
        let query = self
            .query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut preferred: Vec<&str> = self.preferred_categories.iter().map(|c| c.as_str()).collect();
        preferred.sort_unstable();
        let mut excluded: Vec<&str> = self.excluded_categories.iter().map(|c| c.as_str()).collect();
        excluded.sort_unstable();
        let colors: Vec<String> = self.preferred_colors.iter().map(|c| c.to_lowercase()).collect();
        let sizes: Vec<String> = self
            .size_constraints
            .iter()
            .map(|(c, s)| format!("{}={}", c, s.to_lowercase()))
            .collect();

        format!(
            "q={}|occ={}|budget={}|pref={}|excl={}|colors={}|sizes={}|sale={}|max={}",
            query,
            self.occasion.as_deref().unwrap_or("").to_lowercase(),
            self.budget.map(|b| b.to_string()).unwrap_or_default(),
            preferred.join(","),
            excluded.join(","),
            colors.join(","),
            sizes.join(","),
            self.include_sale_items,
            self.max_results
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_budget() {
        for budget in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let request = StyleRequest::new("linen shirt").with_budget(budget);
            assert!(
                matches!(request.validate(), Err(TizzlError::InvalidRequest(_))),
                "budget {} should be rejected",
                budget
            );
        }
        assert!(StyleRequest::new("linen shirt").with_budget(0.01).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_results_and_blank_query() {
        assert!(StyleRequest::new("tee").with_max_results(0).validate().is_err());
        assert!(StyleRequest::new("   ").validate().is_err());
        assert!(StyleRequest::new("tee").validate().is_ok());
    }

    #[test]
    fn test_cache_key_normalises() {
        let a = StyleRequest::new("  Black   Dress ")
            .prefer_category(Category::Dresses)
            .prefer_category(Category::Shoes)
            .prefer_color("Black");
        let b = StyleRequest::new("black dress")
            .prefer_category(Category::Shoes)
            .prefer_category(Category::Dresses)
            .prefer_color("black");
        assert_eq!(a.cache_key(), b.cache_key());

        let c = b.clone().with_max_results(5);
        assert_ne!(b.cache_key(), c.cache_key());
    }

    #[test]
    fn test_cache_key_keeps_exact_budget() {
        let a = StyleRequest::new("coat").with_budget(100.004);
        let b = StyleRequest::new("coat").with_budget(100.001);
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(
            a.cache_key(),
            StyleRequest::new("coat").with_budget(100.004).cache_key()
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: StyleRequest = serde_json::from_str(r#"{"query":"boots"}"#).unwrap();
        assert_eq!(request.max_results, DEFAULT_MAX_RESULTS);
        assert!(request.include_sale_items);
        assert!(request.budget.is_none());
    }
}
