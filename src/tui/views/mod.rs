pub mod closed;
pub mod connections;
pub mod dashboard;

/// The three navigable console views.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Connections,
    Closed,
    Dashboard,
}

impl View {
    /// Human-readable title for the tab bar.
    pub fn title(&self) -> &str {
        match self {
            Self::Connections => "Connections",
            Self::Closed => "Closed",
            Self::Dashboard => "Dashboard",
        }
    }

    /// Zero-based index (matches tab ordering).
    pub fn index(&self) -> usize {
        match self {
            Self::Connections => 0,
            Self::Closed => 1,
            Self::Dashboard => 2,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Connections => Self::Closed,
            Self::Closed => Self::Dashboard,
            Self::Dashboard => Self::Connections,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Self::Connections => Self::Dashboard,
            Self::Closed => Self::Connections,
            Self::Dashboard => Self::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_and_prev_are_inverse() {
        for v in [View::Connections, View::Closed, View::Dashboard] {
            assert_eq!(v.next().prev(), v);
            assert_eq!(v.prev().next(), v);
        }
    }
}
