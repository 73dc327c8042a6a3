//! Pending-work queue and visited set driving a crawl

use crate::{FightId, PageKind};
use std::collections::{HashSet, VecDeque};

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Event(String),
    Fighter(String),
    /// A detail page is only visited for a fight that already exists
    FightDetail { url: String, fight_id: FightId },
}

impl Task {
    pub fn url(&self) -> &str {
        match self {
            Task::Event(url) | Task::Fighter(url) => url,
            Task::FightDetail { url, .. } => url,
        }
    }

    pub fn kind(&self) -> PageKind {
        match self {
            Task::Event(_) => PageKind::Event,
            Task::Fighter(_) => PageKind::Fighter,
            Task::FightDetail { .. } => PageKind::FightDetail,
        }
    }
}

/// FIFO of tasks plus the URLs already queued or visited
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Task>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task unless its URL was already seen; returns whether it was added
    pub fn push(&mut self, task: Task) -> bool {
        let url = task.url();
        if self.visited.contains(url) || self.queued.contains(url) {
            return false;
        }
        self.queued.insert(url.to_string());
        self.queue.push_back(task);
        true
    }

    /// Classify a bare link and enqueue it
    ///
    /// Fight detail links and unrecognised links are never queued this way.
    pub fn push_url(&mut self, url: &str) -> bool {
        match PageKind::from_url(url) {
            Some(PageKind::Event) => self.push(Task::Event(url.to_string())),
            Some(PageKind::Fighter) => self.push(Task::Fighter(url.to_string())),
            Some(PageKind::FightDetail) | None => false,
        }
    }

    /// Take the next task, marking its URL visited
    pub fn pop(&mut self) -> Option<Task> {
        let task = self.queue.pop_front()?;
        self.queued.remove(task.url());
        self.visited.insert(task.url().to_string());
        Some(task)
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
