use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::transport::{ResourceLister, ResourceTransport, UrlInfo};

/// An in-memory repository that records every probe.
#[derive(Default)]
pub(crate) struct FakeRepository {
    resources: BTreeMap<String, UrlInfo>,
    directories: BTreeMap<String, Vec<String>>,
    probes: Mutex<Vec<String>>,
}
impl FakeRepository {
    pub(crate) fn with_resource(mut self, location: &str, last_modified: Option<DateTime<Utc>>) -> FakeRepository {
        self.resources.insert(location.to_string(), UrlInfo::available(100, last_modified, "ISO-8859-1"));
        self
    }

    pub(crate) fn with_directory(mut self, parent: &str, names: &[&str]) -> FakeRepository {
        self.directories.insert(parent.to_string(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub(crate) fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceTransport for FakeRepository {
    async fn probe(&self, location: &str) -> UrlInfo {
        self.probes.lock().unwrap().push(location.to_string());
        self.resources.get(location)
            .cloned()
            .unwrap_or(UrlInfo::UNAVAILABLE)
    }
}

#[async_trait]
impl ResourceLister for FakeRepository {
    async fn list(&self, parent: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.directories.get(parent).cloned().unwrap_or_default())
    }
}

pub(crate) fn year(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
}
