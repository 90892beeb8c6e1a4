use crate::config::MigratorConfig;
use crate::types::{ChangeEvent, Identity, WorkItem};

/// Builds commit messages and identities from change events.
pub struct CommitComposer<'a> {
    config: &'a MigratorConfig,
}

impl<'a> CommitComposer<'a> {
    pub fn new(config: &'a MigratorConfig) -> Self {
        Self { config }
    }

    /// Author (also used as committer) and message for `event`.
    pub fn compose(&self, event: &ChangeEvent) -> (Identity, String) {
        let author = Identity::new(
            &event.creator_name,
            &event.email_address,
            event.creation_time_millis,
        );
        let message = self.commit_message(&self.work_item_numbers(&event.work_items), &event.comment);
        (author, message)
    }

    /// Work-item numbers rendered with the number format and joined by the
    /// delimiter, in event order. Empty when there are none.
    pub fn work_item_numbers(&self, work_items: &[WorkItem]) -> String {
        work_items
            .iter()
            .map(|item| {
                self.config
                    .workitem_number_format
                    .render(&[item.number.to_string().as_str()])
            })
            .collect::<Vec<_>>()
            .join(&self.config.workitem_number_delimiter)
    }

    pub fn commit_message(&self, work_items: &str, comment: &str) -> String {
        self.config
            .commit_message_format
            .render(&[work_items, comment])
            .trim()
            .to_string()
    }
}
