use std::collections::VecDeque;

const MAX_NOTICES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible message (status bar toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Bounded queue of notices, newest last.
#[derive(Debug, Default, Clone)]
pub struct Notices {
    items: VecDeque<Notice>,
}

impl Notices {
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    fn push(&mut self, level: NoticeLevel, message: String) {
        if self.items.len() == MAX_NOTICES {
            self.items.pop_front();
        }
        self.items.push_back(Notice { level, message });
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notice> {
        self.items
            .iter()
            .filter(|notice| notice.level == NoticeLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_bounded() {
        let mut notices = Notices::default();
        for i in 0..(MAX_NOTICES + 5) {
            notices.info(format!("n{}", i));
        }
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices.latest().unwrap().message, format!("n{}", MAX_NOTICES + 4));
        assert_eq!(notices.iter().next().unwrap().message, "n5");
    }

    #[test]
    fn test_error_filter() {
        let mut notices = Notices::default();
        notices.info("ok");
        notices.error("boom");
        assert_eq!(notices.errors().count(), 1);
        assert_eq!(notices.latest().unwrap().level, NoticeLevel::Error);
    }
}
