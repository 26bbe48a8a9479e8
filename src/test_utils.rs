//! Shared fixtures and recording collaborators for unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use alloy_primitives::{address, Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};

use crate::{
    metadata::PublicationMetadata,
    publisher::{Publisher, PublisherConfig},
    queue::TransactionQueue,
    request::SubmissionRequest,
    signature::{CommentWithSigValue, PostWithSigValue, TypedData, TypedDataDomain, TypedDataValue, WithSigArgs},
    traits::{
        BroadcastResult, MetadataStore, RelayApi, RelayResult, TextImageRenderer, TypedDataOptions,
        TypedDataResponse, Wallet,
    },
    types::{Dispatcher, Profile, ProfileId, TransportError, WalletError},
};

/// Deadline of every generated payload.
pub(crate) const DEADLINE: u64 = 1_700_000_000;

const COLLECT_MODULE: Address = address!("0x23b9467334beb345aaa6fd1545538f3d54436e96");

/// Profile `0x01` (`alice`), optionally with a usable dispatcher.
pub(crate) fn profile(dispatcher: bool) -> Profile {
    Profile {
        id: ProfileId("0x01".into()),
        handle: "alice".into(),
        dispatcher: dispatcher.then(|| Dispatcher {
            address: address!("0x6c1e1bc39b13f9e0af9424d76de899203f47755f"),
            can_use_relay: true,
        }),
    }
}

fn domain() -> TypedDataDomain {
    TypedDataDomain {
        name: "Lens Protocol Profiles".into(),
        version: "1".into(),
        chain_id: 80001,
        verifying_contract: address!("0x60ae865ee4c725cd04353b5aab364553f56cef82"),
    }
}

fn post_value(content_uri: &str, nonce: u64) -> PostWithSigValue {
    PostWithSigValue {
        profile_id: U256::from(1),
        content_uri: content_uri.to_string(),
        collect_module: COLLECT_MODULE,
        collect_module_init_data: Bytes::new(),
        reference_module: Address::ZERO,
        reference_module_init_data: Bytes::new(),
        nonce: U256::from(nonce),
        deadline: U256::from(DEADLINE),
    }
}

fn comment_value(content_uri: &str, nonce: u64) -> CommentWithSigValue {
    CommentWithSigValue {
        base: post_value(content_uri, nonce),
        profile_id_pointed: U256::from(2),
        pub_id_pointed: U256::from(7),
        reference_module_data: Bytes::new(),
    }
}

/// `PostWithSig` typed data with the given nonce.
pub(crate) fn post_typed_data(nonce: u64) -> TypedData {
    TypedData { domain: domain(), value: TypedDataValue::Post(post_value("ar://post", nonce)) }
}

/// `CommentWithSig` typed data pointing at publication 7 of profile 2.
pub(crate) fn comment_typed_data(nonce: u64) -> TypedData {
    TypedData {
        domain: domain(),
        value: TypedDataValue::Comment(comment_value("ar://comment", nonce)),
    }
}

/// A collaborator call, in the order it happened.
#[derive(Debug, Clone)]
pub(crate) enum Call {
    Upload(PublicationMetadata),
    Render,
    PostViaDispatcher(SubmissionRequest),
    CommentViaDispatcher(SubmissionRequest),
    PostTypedData(SubmissionRequest, TypedDataOptions),
    CommentTypedData(SubmissionRequest, TypedDataOptions),
    Broadcast(String),
    Sign,
    Write(WithSigArgs),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

fn record(log: &CallLog, call: Call) {
    log.lock().unwrap().push(call);
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockStore {
    calls: CallLog,
    fail: Arc<AtomicBool>,
}

impl MockStore {
    pub(crate) fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl MetadataStore for MockStore {
    async fn upload(&self, metadata: &PublicationMetadata) -> Result<String, TransportError> {
        record(&self.calls, Call::Upload(metadata.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Upload("storage unavailable".into()));
        }
        Ok("abc".into())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockRenderer {
    calls: CallLog,
}

impl TextImageRenderer for MockRenderer {
    async fn render(
        &self,
        _content: &str,
        handle: &str,
        _created_on: DateTime<Utc>,
    ) -> Result<String, TransportError> {
        record(&self.calls, Call::Render);
        Ok(format!("https://img.test/{handle}.svg"))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockApi {
    calls: CallLog,
    dispatcher: Arc<Mutex<RelayResult>>,
    broadcast: Arc<Mutex<BroadcastResult>>,
    swap: Arc<AtomicBool>,
}

impl MockApi {
    fn new(calls: CallLog) -> Self {
        Self {
            calls,
            dispatcher: Arc::new(Mutex::new(RelayResult::Relayed {
                tx_hash: B256::repeat_byte(0xdd),
                tx_id: "dispatcher-tx".into(),
            })),
            broadcast: Arc::new(Mutex::new(BroadcastResult::Relayed {
                tx_hash: B256::repeat_byte(0xbb),
                tx_id: "broadcast-tx".into(),
            })),
            swap: Arc::default(),
        }
    }

    pub(crate) fn set_dispatcher(&self, result: RelayResult) {
        *self.dispatcher.lock().unwrap() = result;
    }

    pub(crate) fn set_broadcast(&self, result: BroadcastResult) {
        *self.broadcast.lock().unwrap() = result;
    }

    /// Makes typed-data generation return the other variant.
    pub(crate) fn swap_typed_data(&self) {
        self.swap.store(true, Ordering::SeqCst);
    }

    fn typed_data(&self, request: &SubmissionRequest, nonce: u64, comment: bool) -> TypedDataResponse {
        let value = if comment ^ self.swap.load(Ordering::SeqCst) {
            TypedDataValue::Comment(comment_value(&request.content_uri, nonce))
        } else {
            TypedDataValue::Post(post_value(&request.content_uri, nonce))
        };
        TypedDataResponse { id: format!("typed-{nonce}"), typed_data: TypedData { domain: domain(), value } }
    }
}

impl RelayApi for MockApi {
    async fn create_post_via_dispatcher(
        &self,
        request: &SubmissionRequest,
    ) -> Result<RelayResult, TransportError> {
        record(&self.calls, Call::PostViaDispatcher(request.clone()));
        Ok(self.dispatcher.lock().unwrap().clone())
    }

    async fn create_comment_via_dispatcher(
        &self,
        request: &SubmissionRequest,
    ) -> Result<RelayResult, TransportError> {
        record(&self.calls, Call::CommentViaDispatcher(request.clone()));
        Ok(self.dispatcher.lock().unwrap().clone())
    }

    async fn create_post_typed_data(
        &self,
        request: &SubmissionRequest,
        options: TypedDataOptions,
    ) -> Result<TypedDataResponse, TransportError> {
        record(&self.calls, Call::PostTypedData(request.clone(), options));
        Ok(self.typed_data(request, options.override_sig_nonce, false))
    }

    async fn create_comment_typed_data(
        &self,
        request: &SubmissionRequest,
        options: TypedDataOptions,
    ) -> Result<TypedDataResponse, TransportError> {
        record(&self.calls, Call::CommentTypedData(request.clone(), options));
        Ok(self.typed_data(request, options.override_sig_nonce, true))
    }

    async fn broadcast(&self, id: &str, _signature: &Bytes) -> Result<BroadcastResult, TransportError> {
        record(&self.calls, Call::Broadcast(id.to_string()));
        Ok(self.broadcast.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockWallet {
    calls: CallLog,
    reject: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockWallet {
    pub(crate) fn reject_signatures(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl Wallet for MockWallet {
    async fn sign_typed_data(&self, _typed_data: &TypedData) -> Result<Bytes, WalletError> {
        record(&self.calls, Call::Sign);
        if self.reject.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected);
        }
        let mut sig = vec![0x11; 64];
        sig.push(0);
        Ok(sig.into())
    }

    async fn write_with_sig(&self, args: &WithSigArgs) -> Result<B256, TransportError> {
        record(&self.calls, Call::Write(args.clone()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Chain("execution reverted".into()));
        }
        Ok(B256::repeat_byte(0xee))
    }
}

/// Mocks sharing one call log, plus the queue they publish into.
#[derive(Debug)]
pub(crate) struct Harness {
    calls: CallLog,
    pub(crate) store: MockStore,
    pub(crate) renderer: MockRenderer,
    pub(crate) api: MockApi,
    pub(crate) wallet: MockWallet,
    pub(crate) queue: TransactionQueue,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let calls = CallLog::default();
        Self {
            store: MockStore { calls: Arc::clone(&calls), ..Default::default() },
            renderer: MockRenderer { calls: Arc::clone(&calls) },
            api: MockApi::new(Arc::clone(&calls)),
            wallet: MockWallet { calls: Arc::clone(&calls), ..Default::default() },
            queue: TransactionQueue::new(),
            calls,
        }
    }

    pub(crate) fn publisher(&self) -> Publisher<MockStore, MockRenderer, MockApi, MockWallet> {
        self.publisher_with(PublisherConfig::default())
    }

    pub(crate) fn publisher_with(
        &self,
        config: PublisherConfig,
    ) -> Publisher<MockStore, MockRenderer, MockApi, MockWallet> {
        Publisher::new(
            config,
            self.store.clone(),
            self.renderer.clone(),
            self.api.clone(),
            self.wallet.clone(),
            self.queue.clone(),
        )
    }

    /// Returns every recorded call so far.
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}
