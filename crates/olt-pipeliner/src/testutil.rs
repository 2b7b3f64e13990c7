//! Mock hardware collaborators shared by the unit tests.

use async_trait::async_trait;
use olt_flow::{
    AppId, FlowRuleBatch, FlowRuleError, FlowRuleService, Group, GroupBucket, GroupDescription,
    GroupError, GroupId, GroupKey, GroupService, ObjectiveContext, ObjectiveError, ObjectiveId,
    ObjectiveStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records applied batches; optionally rejects every batch.
pub(crate) struct MockFlowRuleService {
    batches: Mutex<Vec<FlowRuleBatch>>,
    fail: bool,
}

impl MockFlowRuleService {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub(crate) fn batches(&self) -> Vec<FlowRuleBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlowRuleService for MockFlowRuleService {
    async fn apply(&self, batch: FlowRuleBatch) -> Result<(), FlowRuleError> {
        self.batches.lock().unwrap().push(batch);
        if self.fail {
            Err(FlowRuleError::Rejected("mock rejection".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A group request observed by the mock group service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GroupRequest {
    Create(GroupKey),
    Delete(GroupKey),
    AddBuckets(GroupKey, usize),
    RemoveBuckets(GroupKey, usize),
}

/// Records group requests and serves lookups from a programmable table.
pub(crate) struct MockGroupService {
    requests: Mutex<Vec<GroupRequest>>,
    installed: Mutex<HashMap<GroupKey, Group>>,
    fail: bool,
}

impl MockGroupService {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            installed: Mutex::new(HashMap::new()),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            installed: Mutex::new(HashMap::new()),
            fail: true,
        })
    }

    /// Marks a group as installed so `get_group` resolves it.
    pub(crate) fn install(&self, key: GroupKey, id: GroupId) {
        self.installed
            .lock()
            .unwrap()
            .insert(key.clone(), Group { id, key });
    }

    pub(crate) fn requests(&self) -> Vec<GroupRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: GroupRequest) -> Result<(), GroupError> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            Err(GroupError::Rejected("mock rejection".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GroupService for MockGroupService {
    async fn create_group(&self, desc: GroupDescription) -> Result<(), GroupError> {
        self.record(GroupRequest::Create(desc.key))
    }

    async fn delete_group(
        &self,
        _device: &str,
        key: &GroupKey,
        _app_id: AppId,
    ) -> Result<(), GroupError> {
        self.record(GroupRequest::Delete(key.clone()))
    }

    async fn add_buckets(
        &self,
        _device: &str,
        key: &GroupKey,
        buckets: Vec<GroupBucket>,
        _app_id: AppId,
    ) -> Result<(), GroupError> {
        self.record(GroupRequest::AddBuckets(key.clone(), buckets.len()))
    }

    async fn remove_buckets(
        &self,
        _device: &str,
        key: &GroupKey,
        buckets: Vec<GroupBucket>,
        _app_id: AppId,
    ) -> Result<(), GroupError> {
        self.record(GroupRequest::RemoveBuckets(key.clone(), buckets.len()))
    }

    fn get_group(&self, _device: &str, key: &GroupKey) -> Option<Group> {
        self.installed.lock().unwrap().get(key).cloned()
    }
}

/// In-memory objective store.
pub(crate) struct MockObjectiveStore {
    records: Mutex<HashMap<ObjectiveId, Vec<u8>>>,
}

impl MockObjectiveStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
        })
    }
}

impl ObjectiveStore for MockObjectiveStore {
    fn put_next_group(&self, next_id: ObjectiveId, record: Vec<u8>) {
        self.records.lock().unwrap().insert(next_id, record);
    }

    fn get_next_group(&self, next_id: ObjectiveId) -> Option<Vec<u8>> {
        self.records.lock().unwrap().get(&next_id).cloned()
    }
}

/// Objective context that records every outcome it receives.
pub(crate) struct RecordingContext {
    outcomes: Mutex<Vec<Result<(), ObjectiveError>>>,
}

impl RecordingContext {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn outcomes(&self) -> Vec<Result<(), ObjectiveError>> {
        self.outcomes.lock().unwrap().clone()
    }

    /// Waits for the first outcome; panics if none arrives.
    pub(crate) async fn settled(&self) -> Result<(), ObjectiveError> {
        for _ in 0..1000 {
            if let Some(outcome) = self.outcomes.lock().unwrap().first().cloned() {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("objective never settled");
    }
}

impl ObjectiveContext for RecordingContext {
    fn on_success(&self) {
        self.outcomes.lock().unwrap().push(Ok(()));
    }

    fn on_error(&self, error: ObjectiveError) {
        self.outcomes.lock().unwrap().push(Err(error));
    }
}

/// Builds a pipeliner wired to fresh mocks.
pub(crate) fn pipeliner() -> (
    Arc<crate::OltPipeliner>,
    Arc<MockFlowRuleService>,
    Arc<MockGroupService>,
    Arc<MockObjectiveStore>,
) {
    let flow_rules = MockFlowRuleService::new();
    let groups = MockGroupService::new();
    let store = MockObjectiveStore::new();
    let pipeliner = Arc::new(crate::OltPipeliner::new(
        crate::PipelinerConfig::new("olt-1"),
        flow_rules.clone(),
        groups.clone(),
        store.clone(),
    ));
    (pipeliner, flow_rules, groups, store)
}
