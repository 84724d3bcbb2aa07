//! An in-process host speaking the revision protocol.
//!
//! The mock binds a real TCP listener and serves the handshake and
//! iteration loop the way a production host would: signed settings each
//! iteration, revision validation, signature exchange, and sector
//! storage for downloads. Behavior knobs let tests provoke the failure
//! paths (price increases, stop responses, foreign handshake revisions).

use std::collections::HashMap;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use rand::RngCore;

use tessera_crypto::ed25519::{Signature, SigningKey};
use tessera_proto::actions::ActionSet;
use tessera_proto::negotiate::expected_challenge;
use tessera_proto::{
    ACTION_DOWNLOAD, ACTION_UPLOAD, CHALLENGE_LEN, MAX_REVISION_LEN, MAX_SIGNATURE_LEN,
    SPEC_SETTINGS,
};
use tessera_types::{
    ContractRevision, CoveredFields, Currency, HostSettings, Transaction, TransactionSignature,
    SECTOR_SIZE,
};
use tessera_wire::frame::{
    read_object, read_prefixed, read_response, read_specifier, write_object, write_prefixed,
    write_response, write_signed_object, write_specifier,
};
use tessera_wire::Response;

/// Behavior knobs for provoking protocol edge cases.
#[derive(Clone, Default)]
pub struct HostBehavior {
    /// Raise the storage price by one after this many settings exchanges.
    pub raise_storage_price_after: Option<u64>,
    /// Answer the renter's signature with a stop response instead of an
    /// acceptance. The iteration still completes.
    pub stop_after_signature: bool,
    /// Present this revision and signature set during the handshake
    /// instead of the host's actual state.
    pub handshake_override: Option<(ContractRevision, Vec<TransactionSignature>)>,
}

struct HostState {
    revision: ContractRevision,
    signatures: Vec<TransactionSignature>,
    sectors: HashMap<u64, Vec<u8>>,
    settings_sent: u64,
}

/// A mock host bound to a local TCP port.
pub struct MockHost {
    addr: String,
    key: SigningKey,
    state: Arc<Mutex<HostState>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockHost {
    /// Start a host serving `settings`, whose contract state begins at
    /// `revision` with `signatures`.
    pub fn spawn(
        key: SigningKey,
        settings: HostSettings,
        revision: ContractRevision,
        signatures: Vec<TransactionSignature>,
        behavior: HostBehavior,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock host");
        let addr = listener.local_addr().expect("local addr").to_string();

        let state = Arc::new(Mutex::new(HostState {
            revision,
            signatures,
            sectors: HashMap::new(),
            settings_sent: 0,
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_key = key.clone();
        let thread_state = Arc::clone(&state);
        let thread_shutdown = Arc::clone(&shutdown);
        let mut thread_settings = settings;
        thread_settings.net_address = addr.clone();

        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                if thread_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { break };
                // Connection errors mean the renter went away; the next
                // accept serves the next session.
                let _ = serve(
                    stream,
                    &thread_key,
                    &thread_settings,
                    &thread_state,
                    &behavior,
                );
            }
        });

        Self {
            addr,
            key,
            state,
            shutdown,
            handle: Some(handle),
        }
    }

    /// The address the host listens on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The host's identity key.
    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// The host's current view of the contract revision.
    pub fn current_revision(&self) -> ContractRevision {
        self.state.lock().expect("host state").revision.clone()
    }

    /// The sector stored at `index`, if any.
    pub fn stored_sector(&self, index: u64) -> Option<Vec<u8>> {
        self.state.lock().expect("host state").sectors.get(&index).cloned()
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Unblock the accept loop.
        let _ = TcpStream::connect(&self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    mut conn: TcpStream,
    key: &SigningKey,
    settings: &HostSettings,
    state: &Arc<Mutex<HostState>>,
    behavior: &HostBehavior,
) -> std::io::Result<()> {
    let fail = || std::io::Error::other("protocol violation");

    // Handshake: RPC specifier, contract ID, challenge, response.
    let _rpc = read_specifier(&mut conn).map_err(|_| fail())?;
    let _contract_id: tessera_types::ContractId =
        read_object(&mut conn, 64).map_err(|_| fail())?;

    let mut challenge = [0u8; CHALLENGE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut challenge);
    conn.write_all(&challenge)?;

    let sig_bytes = read_prefixed(&mut conn, 256).map_err(|_| fail())?;
    let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| fail())?;
    let renter_key = {
        let state = state.lock().expect("host state");
        let spec = &state.revision.unlock_conditions.public_keys[0];
        let bytes: [u8; 32] = spec.key.as_slice().try_into().map_err(|_| fail())?;
        tessera_crypto::ed25519::VerifyingKey::from_bytes(&bytes).map_err(|_| fail())?
    };
    renter_key
        .verify(&expected_challenge(challenge), &Signature::from_bytes(&sig_bytes))
        .map_err(|_| fail())?;
    write_response(&mut conn, Response::Accept).map_err(|_| fail())?;

    // Present our revision (or the override) for synchronization.
    let (handshake_rev, handshake_sigs) = match &behavior.handshake_override {
        Some((rev, sigs)) => (rev.clone(), sigs.clone()),
        None => {
            let state = state.lock().expect("host state");
            (state.revision.clone(), state.signatures.clone())
        }
    };
    write_object(&mut conn, &handshake_rev).map_err(|_| fail())?;
    write_object(&mut conn, &handshake_sigs).map_err(|_| fail())?;

    // Iteration loop. Settings open every iteration; the renter answers
    // with a stop during teardown.
    loop {
        let mut current_settings = settings.clone();
        {
            let mut state = state.lock().expect("host state");
            if let Some(after) = behavior.raise_storage_price_after {
                if state.settings_sent >= after {
                    current_settings.storage_price = Currency::new(
                        current_settings.storage_price.value() + 1,
                    );
                }
            }
            state.settings_sent += 1;
        }
        write_specifier(&mut conn, &SPEC_SETTINGS).map_err(|_| fail())?;
        write_signed_object(&mut conn, &current_settings, key).map_err(|_| fail())?;

        match read_response(&mut conn) {
            Ok(Response::Accept) => {}
            // Teardown, price refusal, or a vanished renter.
            Ok(Response::Stop) | Err(_) => return Ok(()),
        }

        let actions: ActionSet = read_object(&mut conn, (SECTOR_SIZE + 1024) as u64)
            .map_err(|_| fail())?;
        let revision: ContractRevision =
            read_object(&mut conn, MAX_REVISION_LEN).map_err(|_| fail())?;

        // Host-side sanity: monotonic number, conserved payouts.
        {
            let state = state.lock().expect("host state");
            let ok = revision.revision_number > state.revision.revision_number
                && revision.check_invariants().is_ok();
            if !ok {
                write_response(&mut conn, Response::Stop).map_err(|_| fail())?;
                return Ok(());
            }
        }
        write_response(&mut conn, Response::Accept).map_err(|_| fail())?;

        let renter_sig: TransactionSignature =
            read_object(&mut conn, MAX_SIGNATURE_LEN).map_err(|_| fail())?;

        let response = if behavior.stop_after_signature {
            Response::Stop
        } else {
            Response::Accept
        };
        write_response(&mut conn, response).map_err(|_| fail())?;

        // Countersign and return our signature.
        let mut txn = Transaction {
            revisions: vec![revision.clone()],
            signatures: vec![
                renter_sig,
                TransactionSignature {
                    parent_id: revision.parent_id.0,
                    public_key_index: 1,
                    timelock: 0,
                    covered_fields: CoveredFields::revision(0),
                    signature: Vec::new(),
                },
            ],
            ..Transaction::default()
        };
        txn.sign(1, key).map_err(|_| fail())?;
        write_object(&mut conn, &txn.signatures[1]).map_err(|_| fail())?;

        // Serve download data; store upload data.
        let mut state = state.lock().expect("host state");
        for action in &actions.0 {
            if action.action_type == ACTION_UPLOAD {
                state.sectors.insert(action.sector_index, action.data.clone());
            } else if action.action_type == ACTION_DOWNLOAD {
                let sector = state.sectors.get(&action.sector_index).ok_or_else(fail)?;
                let start = action.offset as usize;
                let end = start + action.length as usize;
                let data = sector.get(start..end).ok_or_else(fail)?;
                write_prefixed(&mut conn, data).map_err(|_| fail())?;
            }
        }
        state.revision = txn.revisions.remove(0);
        state.signatures = txn.signatures;
    }
}
