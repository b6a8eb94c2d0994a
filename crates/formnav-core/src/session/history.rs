//! Breadcrumb and selection bookkeeping.
//!
//! Both lists are append-only and purely derived from applied input; the
//! resolver never reads them.

/// Navigation history of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    breadcrumbs: Vec<String>,
    selections: Vec<String>,
}

impl NavigationHistory {
    /// Starts a trail whose first breadcrumb is the app title.
    pub fn seeded(app_title: impl Into<String>) -> Self {
        Self {
            breadcrumbs: vec![app_title.into()],
            selections: Vec::new(),
        }
    }

    pub fn push_breadcrumb(&mut self, breadcrumb: impl Into<String>) {
        self.breadcrumbs.push(breadcrumb.into());
    }

    pub fn add_selection(&mut self, selection: impl Into<String>) {
        self.selections.push(selection.into());
    }

    pub fn breadcrumbs(&self) -> &[String] {
        &self.breadcrumbs
    }

    pub fn selections(&self) -> &[String] {
        &self.selections
    }

    /// Drops everything and reseeds with the app title.
    pub fn reset(&mut self, app_title: impl Into<String>) {
        *self = Self::seeded(app_title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_title() {
        let history = NavigationHistory::seeded("My App");
        assert_eq!(history.breadcrumbs(), ["My App".to_string()]);
        assert!(history.selections().is_empty());
    }

    #[test]
    fn test_reset_clears_selections() {
        let mut history = NavigationHistory::seeded("App");
        history.push_breadcrumb("Cases");
        history.add_selection("0");
        history.reset("App");
        assert_eq!(history.breadcrumbs().len(), 1);
        assert!(history.selections().is_empty());
    }
}
