//! Display ordering of tasks within a category.
//!
//! Tasks of one category are grouped by subcategory, buckets kept in the order
//! they are first seen. Inside a bucket unfinished tasks come first, then
//! completed ones, each newest first. Sorting is stable so equal creation
//! times keep their input order.

use crate::fields::Category;
use crate::task::Task;

/// Bucket label for tasks without a subcategory.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The tasks sharing one (category, subcategory) pair, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a> {
    pub label: &'a str,
    pub tasks: Vec<&'a Task>,
}

fn bucket_label(task: &Task) -> &str {
    task.subcategory
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNCATEGORIZED)
}

/// Group and order the tasks of `category`, keeping bucket labels.
pub fn buckets(tasks: &[Task], category: Category) -> Vec<Bucket<'_>> {
    let mut groups: Vec<Bucket<'_>> = Vec::new();
    for task in tasks.iter().filter(|t| t.category == category) {
        let label = bucket_label(task);
        match groups.iter_mut().find(|b| b.label == label) {
            Some(bucket) => bucket.tasks.push(task),
            None => groups.push(Bucket { label, tasks: vec![task] }),
        }
    }

    for bucket in &mut groups {
        let (mut open, mut done): (Vec<&Task>, Vec<&Task>) =
            std::mem::take(&mut bucket.tasks)
                .into_iter()
                .partition(|t| !t.status.is_completed());
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        done.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        open.extend(done);
        bucket.tasks = open;
    }
    groups
}

/// The tasks of `category` as one ordered sequence.
pub fn project(tasks: &[Task], category: Category) -> Vec<&Task> {
    buckets(tasks, category)
        .into_iter()
        .flat_map(|b| b.tasks)
        .collect()
}
