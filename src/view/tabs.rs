/// Top-level tabs of the review view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    /// Tab 1: search form
    Query,
    /// Tab 2: result table with bulk controls
    List,
    /// Tab 3: one edit panel per record
    Update,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Query, Tab::List, Tab::Update];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Query => "QUERY",
            Tab::List => "LIST",
            Tab::Update => "UPDATE",
        }
    }

    pub fn digit(self) -> char {
        match self {
            Tab::Query => '1',
            Tab::List => '2',
            Tab::Update => '3',
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Tab::Query),
            '2' => Some(Tab::List),
            '3' => Some(Tab::Update),
            _ => None,
        }
    }

    /// Get the next tab, wrapping around
    pub fn next(self) -> Self {
        match self {
            Tab::Query => Tab::List,
            Tab::List => Tab::Update,
            Tab::Update => Tab::Query,
        }
    }

    /// Get the previous tab, wrapping around
    pub fn prev(self) -> Self {
        match self {
            Tab::Query => Tab::Update,
            Tab::List => Tab::Query,
            Tab::Update => Tab::List,
        }
    }

    /// List and Update stay hidden until the first query succeeds.
    pub fn needs_results(self) -> bool {
        !matches!(self, Tab::Query)
    }
}

/// Result of asking to switch tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRequest {
    Switched,
    /// Already on that tab
    Unchanged,
    /// Tab not revealed yet
    Hidden,
    /// Unsaved edits exist; confirm with `force_tab`
    NeedsConfirmation,
}
