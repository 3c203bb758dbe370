use crate::cache::CacheStorage;
use crate::prelude::*;
use msg::platform::bridge::{
    events::*, BridgeOp, CircuitBreaker, Deposit, DepositStatus, ExternalAsset, ExternalChain,
    RateLimitWindow, SessionStatus, SignatureShare, TssSession, Withdrawal, WithdrawalStatus,
};
use sha2::{Digest, Sha256};

const CHAINS: Map<&str, ExternalChain> = Map::new(namespace::CHAINS);
const CHAIN_ASSETS: Map<(&str, &str), ExternalAsset> = Map::new(namespace::CHAIN_ASSETS);

const LAST_DEPOSIT_ID: Item<DepositId> = Item::new(namespace::LAST_DEPOSIT_ID);
const DEPOSITS: Map<DepositId, Deposit> = Map::new(namespace::DEPOSITS);
/// `(chain, external tx hash)` uniqueness, the duplicate-observation guard.
const DEPOSITS_BY_TX: Map<(&str, &str), DepositId> = Map::new(namespace::DEPOSITS_BY_TX);

const LAST_WITHDRAWAL_ID: Item<WithdrawalId> = Item::new(namespace::LAST_WITHDRAWAL_ID);
const WITHDRAWALS: Map<WithdrawalId, Withdrawal> = Map::new(namespace::WITHDRAWALS);
/// Timelocked withdrawals by expiry, for the EndBlock sweep.
const WITHDRAWAL_TIMELOCKS: Map<(u64, WithdrawalId), ()> =
    Map::new(namespace::WITHDRAWAL_TIMELOCKS);

const LAST_SESSION_ID: Item<SessionId> = Item::new(namespace::LAST_SESSION_ID);
const TSS_SESSIONS: Map<SessionId, TssSession> = Map::new(namespace::TSS_SESSIONS);
/// Live sessions by timeout, for the EndBlock sweep.
const SESSION_TIMEOUTS: Map<(u64, SessionId), ()> = Map::new(namespace::SESSION_TIMEOUTS);

const RATE_LIMITS: Map<(&str, &str, u64), RateLimitWindow> =
    Map::new(namespace::RATE_LIMIT_WINDOWS);
const CIRCUIT: Item<CircuitBreaker> = Item::new(namespace::CIRCUIT_BREAKER);

impl State<'_> {
    fn circuit_breaker(&self, store: &dyn Storage) -> Result<CircuitBreaker> {
        Ok(CIRCUIT.may_load(store)?.unwrap_or_default())
    }

    fn assert_circuit_allows(&self, store: &dyn Storage, op: BridgeOp) -> Result<()> {
        platform_ensure!(
            self.circuit_breaker(store)?.allows(op, self.now()),
            ErrorId::CircuitBreakerActive,
            ErrorDomain::Bridge,
            "the circuit breaker forbids {op}"
        );
        Ok(())
    }

    fn assert_eligible_validator(&self, store: &dyn Storage, addr: &Addr) -> Result<()> {
        platform_ensure!(
            self.staking.is_validator(store, addr)?,
            ErrorId::NotValidator,
            ErrorDomain::Bridge,
            "{addr} is not a validator"
        );
        let tier = self.staking.tier_of(store, addr)?;
        platform_ensure!(
            tier >= self.config.min_validator_tier,
            ErrorId::InsufficientTier,
            ErrorDomain::Bridge,
            "{addr} is below the bridge validator tier"
        );
        Ok(())
    }

    fn eligible_validators(&self, store: &dyn Storage) -> Result<Vec<Addr>> {
        self.staking
            .validators_by_min_tier(store, self.config.min_validator_tier)
    }

    /// `max(1, ceil(threshold × eligible))`.
    fn threshold_count(&self, threshold: Decimal, eligible: usize) -> u32 {
        let required = (Decimal::from_ratio(eligible as u128, 1u128) * threshold)
            .to_uint_ceil()
            .u128() as u32;
        required.max(1)
    }

    fn load_chain_asset(
        &self,
        store: &dyn Storage,
        chain_id: &str,
        asset: &str,
    ) -> Result<(ExternalChain, ExternalAsset)> {
        let chain = CHAINS.may_load(store, chain_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::ChainNotSupported,
                ErrorDomain::Bridge,
                "chain {chain_id} is not supported"
            )
        })?;
        platform_ensure!(
            chain.enabled,
            ErrorId::BridgingDisabled,
            ErrorDomain::Bridge,
            "bridging on {chain_id} is disabled"
        );
        let asset_cfg = CHAIN_ASSETS
            .may_load(store, (chain_id, asset))?
            .ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::AssetNotSupported,
                    ErrorDomain::Bridge,
                    "asset {asset} is not supported on {chain_id}"
                )
            })?;
        platform_ensure!(
            asset_cfg.enabled,
            ErrorId::AssetNotSupported,
            ErrorDomain::Bridge,
            "asset {asset} is disabled on {chain_id}"
        );
        Ok((chain, asset_cfg))
    }

    /// Consumes rate-limit capacity, materialising the current window on
    /// first touch. Windows are independent per (chain, asset).
    fn consume_rate_limit(
        &self,
        ctx: &mut StateContext,
        chain_id: &str,
        asset_cfg: &ExternalAsset,
        amount: Uint128,
    ) -> Result<()> {
        let duration = asset_cfg
            .rate_limit_window
            .unwrap_or(self.config.rate_limit_window);
        let max_amount = asset_cfg
            .rate_limit_max
            .unwrap_or(self.config.rate_limit_max);
        let window_start = self.now().seconds() / duration * duration;

        let key = (chain_id, asset_cfg.asset.as_str(), window_start);
        let mut window = RATE_LIMITS.may_load(ctx.storage, key)?.unwrap_or(RateLimitWindow {
            window_start,
            window_duration: duration,
            used_amount: Uint128::zero(),
            tx_count: 0,
            max_amount,
        });
        platform_ensure!(
            window.used_amount + amount <= window.max_amount,
            ErrorId::RateLimitExceeded,
            ErrorDomain::Bridge,
            "rate limit window for {}/{} is exhausted",
            chain_id,
            asset_cfg.asset
        );
        window.used_amount += amount;
        window.tx_count += 1;
        RATE_LIMITS.save(ctx.storage, key, &window)?;
        Ok(())
    }

    // deposits

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn observe_deposit(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        chain_id: String,
        asset: String,
        external_tx_hash: String,
        external_block_height: u64,
        external_sender: String,
        recipient: Addr,
        amount: Uint128,
    ) -> Result<DepositId> {
        self.assert_circuit_allows(ctx.storage, BridgeOp::Deposit)?;
        self.assert_eligible_validator(ctx.storage, sender)?;
        let (chain, asset_cfg) = self.load_chain_asset(ctx.storage, &chain_id, &asset)?;

        platform_ensure!(
            amount >= chain.min_deposit,
            ErrorId::AmountTooSmall,
            ErrorDomain::Bridge,
            "deposit below the chain minimum"
        );
        platform_ensure!(
            amount <= chain.max_deposit,
            ErrorId::AmountTooLarge,
            ErrorDomain::Bridge,
            "deposit above the chain maximum"
        );
        platform_ensure!(
            !DEPOSITS_BY_TX.has(ctx.storage, (&chain_id, &external_tx_hash)),
            ErrorId::DuplicateDeposit,
            ErrorDomain::Bridge,
            "{external_tx_hash} on {chain_id} was already observed"
        );

        let converted_amount = amount.mul_floor(asset_cfg.conversion_rate);
        self.consume_rate_limit(ctx, &chain_id, &asset_cfg, converted_amount)?;

        let eligible = self.eligible_validators(ctx.storage)?.len();
        let required_attestations =
            self.threshold_count(self.config.attestation_threshold, eligible);

        let deposit_id = alloc_id(ctx.storage, &LAST_DEPOSIT_ID)?;
        let deposit = Deposit {
            deposit_id,
            chain_id: chain_id.clone(),
            asset: asset.clone(),
            external_tx_hash: external_tx_hash.clone(),
            external_block_height,
            sender: external_sender,
            recipient,
            external_amount: amount,
            converted_amount,
            status: DepositStatus::Pending,
            required_attestations,
            attested_by: vec![],
            created_at: self.now(),
            completed_at: None,
        };
        DEPOSITS.save(ctx.storage, deposit_id, &deposit)?;
        DEPOSITS_BY_TX.save(ctx.storage, (&chain_id, &external_tx_hash), &deposit_id)?;

        ctx.response_mut().add_event(DepositObservedEvent {
            deposit_id,
            chain_id,
            asset,
            tx_hash: external_tx_hash,
            converted_amount,
            required_attestations,
        });
        Ok(deposit_id)
    }

    pub(crate) fn attest_deposit(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        deposit_id: DepositId,
        approved: bool,
        observed_tx_hash: String,
        observed_amount: Uint128,
    ) -> Result<()> {
        self.assert_circuit_allows(ctx.storage, BridgeOp::Attest)?;
        self.assert_eligible_validator(ctx.storage, sender)?;

        let mut deposit = DEPOSITS.may_load(ctx.storage, deposit_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::DepositNotFound,
                ErrorDomain::Bridge,
                "deposit {deposit_id} not found"
            )
        })?;
        match deposit.status {
            DepositStatus::Completed => platform_bail!(
                ErrorId::DepositCompleted,
                ErrorDomain::Bridge,
                "deposit {deposit_id} is already completed"
            ),
            DepositStatus::Rejected => platform_bail!(
                ErrorId::DepositRejected,
                ErrorDomain::Bridge,
                "deposit {deposit_id} was rejected"
            ),
            DepositStatus::Pending | DepositStatus::Attesting => {}
        }
        platform_ensure!(
            !deposit.has_attested(sender),
            ErrorId::AlreadyAttested,
            ErrorDomain::Bridge,
            "{sender} already attested deposit {deposit_id}"
        );

        if !approved {
            ctx.response_mut().add_event(
                Event::new("deposit-refused")
                    .add_attribute(event_key::DEPOSIT_ID, deposit_id.to_string())
                    .add_attribute(event_key::VALIDATOR, sender.to_string()),
            );
            return Ok(());
        }

        // the cross-check: an approval must independently match what the
        // observer recorded
        platform_ensure!(
            observed_tx_hash == deposit.external_tx_hash
                && observed_amount == deposit.external_amount,
            ErrorId::AttestationMismatch,
            ErrorDomain::Bridge,
            "attestation does not match the observed deposit"
        );

        deposit.attested_by.push(sender.clone());
        if deposit.status == DepositStatus::Pending {
            deposit.status = DepositStatus::Attesting;
        }

        ctx.response_mut().add_event(DepositAttestedEvent {
            deposit_id,
            validator: sender.clone(),
            attestations: deposit.observed_attestations(),
            required: deposit.required_attestations,
        });

        if deposit.observed_attestations() >= deposit.required_attestations {
            self.complete_deposit(ctx, &mut deposit)?;
        }
        DEPOSITS.save(ctx.storage, deposit_id, &deposit)?;
        Ok(())
    }

    /// Threshold reached: mint and deliver, or reject a banned recipient.
    fn complete_deposit(&self, ctx: &mut StateContext, deposit: &mut Deposit) -> Result<()> {
        if self.is_banned(ctx.storage, &deposit.recipient)? {
            deposit.status = DepositStatus::Rejected;
            ctx.response_mut().add_event(DepositSettledEvent {
                deposit_id: deposit.deposit_id,
                status: DepositStatus::Rejected,
                recipient: deposit.recipient.clone(),
                minted: Uint128::zero(),
            });
            return Ok(());
        }

        let asset_cfg = CHAIN_ASSETS
            .may_load(ctx.storage, (&deposit.chain_id, &deposit.asset))?
            .ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::AssetNotSupported,
                    ErrorDomain::Bridge,
                    "asset {} vanished from {}",
                    deposit.asset,
                    deposit.chain_id
                )
            })?;

        // mint and delivery are atomic: a failed send discards the mint
        {
            let mut cache = CacheStorage::new(&mut *ctx.storage);
            self.bank.mint(
                &mut cache,
                module::BRIDGE,
                &asset_cfg.internal_denom,
                deposit.converted_amount,
            )?;
            self.bank.send_from_module(
                &mut cache,
                module::BRIDGE,
                &deposit.recipient,
                &asset_cfg.internal_denom,
                deposit.converted_amount,
            )?;
            cache.commit();
        }

        deposit.status = DepositStatus::Completed;
        deposit.completed_at = Some(self.now());
        ctx.response_mut().add_event(DepositSettledEvent {
            deposit_id: deposit.deposit_id,
            status: DepositStatus::Completed,
            recipient: deposit.recipient.clone(),
            minted: deposit.converted_amount,
        });
        Ok(())
    }

    // withdrawals

    pub(crate) fn request_withdrawal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        chain_id: String,
        asset: String,
        recipient: String,
        amount: Uint128,
    ) -> Result<WithdrawalId> {
        self.assert_circuit_allows(ctx.storage, BridgeOp::Withdraw)?;
        self.assert_not_banned(ctx.storage, sender, ErrorDomain::Bridge)?;
        let (_, asset_cfg) = self.load_chain_asset(ctx.storage, &chain_id, &asset)?;

        let balance = self
            .bank
            .balance(ctx.storage, sender, &asset_cfg.internal_denom)?;
        platform_ensure!(
            balance >= amount,
            ErrorId::InsufficientBalance,
            ErrorDomain::Bridge,
            "{sender} holds {balance} {}, asked to withdraw {amount}",
            asset_cfg.internal_denom
        );
        self.consume_rate_limit(ctx, &chain_id, &asset_cfg, amount)?;

        let fee = amount.mul_floor(self.config.bridge_fee_rate);
        let net = amount - fee;
        let external_amount = net
            .checked_div_floor(asset_cfg.conversion_rate)
            .context("conversion rate must be positive")?;
        platform_ensure!(
            !external_amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Bridge,
            "withdrawal rounds to zero externally"
        );

        // escrow, not burn: the burn happens when the signature completes
        self.bank.send_to_module(
            ctx.storage,
            sender,
            module::BRIDGE,
            &asset_cfg.internal_denom,
            amount,
        )?;

        let withdrawal_id = alloc_id(ctx.storage, &LAST_WITHDRAWAL_ID)?;
        let timelock_expiry = self.now().plus_seconds(self.config.withdrawal_timelock);
        let withdrawal = Withdrawal {
            withdrawal_id,
            chain_id: chain_id.clone(),
            asset,
            sender: sender.clone(),
            recipient,
            internal_amount: amount,
            external_amount,
            fee,
            timelock_expiry,
            status: WithdrawalStatus::Pending,
            tss_session_id: None,
            created_at: self.now(),
        };
        WITHDRAWALS.save(ctx.storage, withdrawal_id, &withdrawal)?;
        WITHDRAWAL_TIMELOCKS.save(
            ctx.storage,
            (timelock_expiry.seconds(), withdrawal_id),
            &(),
        )?;

        ctx.response_mut().add_event(WithdrawalRequestedEvent {
            withdrawal_id,
            chain_id,
            internal_amount: amount,
            external_amount,
            fee,
            timelock_expiry,
        });
        Ok(withdrawal_id)
    }

    pub(crate) fn load_withdrawal(
        &self,
        store: &dyn Storage,
        withdrawal_id: WithdrawalId,
    ) -> Result<Withdrawal> {
        WITHDRAWALS
            .may_load(store, withdrawal_id)?
            .ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::WithdrawalNotFound,
                    ErrorDomain::Bridge,
                    "withdrawal {withdrawal_id} not found"
                )
            })
    }

    /// EndBlock step: move withdrawals past their timelock to Ready and
    /// open a signing session for each. Bounded by the timelock index.
    pub(crate) fn process_withdrawal_timelocks(&self, ctx: &mut StateContext) -> Result<()> {
        let due: Vec<(u64, WithdrawalId)> = WITHDRAWAL_TIMELOCKS
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::inclusive(self.now().seconds())),
                Order::Ascending,
            )
            .map(|res| res.map(|(key, ())| key))
            .collect::<Result<_, _>>()?;

        for (at, withdrawal_id) in due {
            WITHDRAWAL_TIMELOCKS.remove(ctx.storage, (at, withdrawal_id));
            let mut withdrawal = self.load_withdrawal(ctx.storage, withdrawal_id)?;
            if !matches!(
                withdrawal.status,
                WithdrawalStatus::Pending | WithdrawalStatus::Timelocked
            ) {
                continue;
            }
            withdrawal.status = WithdrawalStatus::Ready;
            ctx.response_mut().add_event(WithdrawalStatusEvent {
                withdrawal_id,
                status: WithdrawalStatus::Ready,
            });
            self.open_tss_session(ctx, &mut withdrawal)?;
            WITHDRAWALS.save(ctx.storage, withdrawal_id, &withdrawal)?;
        }

        self.sweep_session_timeouts(ctx)
    }

    fn open_tss_session(&self, ctx: &mut StateContext, withdrawal: &mut Withdrawal) -> Result<()> {
        let participants = self.eligible_validators(ctx.storage)?;
        if participants.is_empty() {
            // leave the withdrawal Ready; the next sweep retries
            return Ok(());
        }
        let required_sigs = self.threshold_count(self.config.tss_threshold, participants.len());
        let session_id = alloc_id(ctx.storage, &LAST_SESSION_ID)?;
        let timeout_at = self.now().plus_seconds(self.config.tss_timeout);

        let session = TssSession {
            session_id,
            withdrawal_id: withdrawal.withdrawal_id,
            chain_id: withdrawal.chain_id.clone(),
            participants: participants.clone(),
            required_sigs,
            timeout_at,
            message: signing_message(withdrawal)?,
            shares: vec![],
            combined_signature: None,
            status: SessionStatus::Pending,
        };
        TSS_SESSIONS.save(ctx.storage, session_id, &session)?;
        SESSION_TIMEOUTS.save(ctx.storage, (timeout_at.seconds(), session_id), &())?;

        withdrawal.status = WithdrawalStatus::Signing;
        withdrawal.tss_session_id = Some(session_id);

        ctx.response_mut().add_event(SessionOpenedEvent {
            session_id,
            withdrawal_id: withdrawal.withdrawal_id,
            participants: participants.len() as u32,
            required_sigs,
        });
        ctx.response_mut().add_event(WithdrawalStatusEvent {
            withdrawal_id: withdrawal.withdrawal_id,
            status: WithdrawalStatus::Signing,
        });
        Ok(())
    }

    pub(crate) fn submit_tss_signature(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        session_id: SessionId,
        data: Binary,
    ) -> Result<()> {
        let mut session = TSS_SESSIONS.may_load(ctx.storage, session_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::TssSessionNotFound,
                ErrorDomain::Bridge,
                "tss session {session_id} not found"
            )
        })?;
        match session.status {
            SessionStatus::Completed => platform_bail!(
                ErrorId::TssSessionCompleted,
                ErrorDomain::Bridge,
                "session {session_id} is already completed"
            ),
            SessionStatus::Failed => platform_bail!(
                ErrorId::TssSessionFailed,
                ErrorDomain::Bridge,
                "session {session_id} failed"
            ),
            SessionStatus::Timeout => platform_bail!(
                ErrorId::TssTimeout,
                ErrorDomain::Bridge,
                "session {session_id} timed out"
            ),
            SessionStatus::Pending | SessionStatus::Active => {}
        }
        platform_ensure!(
            session.is_participant(sender),
            ErrorId::NotValidator,
            ErrorDomain::Bridge,
            "{sender} is not a participant in session {session_id}"
        );
        platform_ensure!(
            !session.has_submitted(sender),
            ErrorId::AlreadyAttested,
            ErrorDomain::Bridge,
            "{sender} already submitted a share"
        );

        if self.now() > session.timeout_at {
            self.timeout_session(ctx, &mut session)?;
            TSS_SESSIONS.save(ctx.storage, session_id, &session)?;
            return Ok(());
        }

        session.shares.push(SignatureShare {
            validator: sender.clone(),
            data,
            submitted_at: self.now(),
        });
        if session.status == SessionStatus::Pending {
            session.status = SessionStatus::Active;
        }

        if session.shares.len() as u32 >= session.required_sigs {
            self.complete_session(ctx, &mut session)?;
        }
        TSS_SESSIONS.save(ctx.storage, session_id, &session)?;
        Ok(())
    }

    /// Threshold reached: combine (opaquely), burn the escrow, close the
    /// accounting loop.
    fn complete_session(&self, ctx: &mut StateContext, session: &mut TssSession) -> Result<()> {
        let mut hasher = Sha256::new();
        for share in &session.shares {
            hasher.update(share.data.as_slice());
        }
        session.combined_signature = Some(Binary::from(hasher.finalize().to_vec()));
        session.status = SessionStatus::Completed;
        SESSION_TIMEOUTS.remove(
            ctx.storage,
            (session.timeout_at.seconds(), session.session_id),
        );

        let mut withdrawal = self.load_withdrawal(ctx.storage, session.withdrawal_id)?;
        let asset_cfg = CHAIN_ASSETS
            .may_load(ctx.storage, (&withdrawal.chain_id, &withdrawal.asset))?
            .context("asset config vanished")?;

        // burn the net escrow; the fee moves to the fee module
        let net = withdrawal.internal_amount - withdrawal.fee;
        self.bank
            .burn(ctx.storage, module::BRIDGE, &asset_cfg.internal_denom, net)?;
        if !withdrawal.fee.is_zero() {
            self.bank.send_between_modules(
                ctx.storage,
                module::BRIDGE,
                module::FEES,
                &asset_cfg.internal_denom,
                withdrawal.fee,
            )?;
        }

        withdrawal.status = WithdrawalStatus::Signed;
        WITHDRAWALS.save(ctx.storage, withdrawal.withdrawal_id, &withdrawal)?;

        ctx.response_mut().add_event(SessionClosedEvent {
            session_id: session.session_id,
            status: SessionStatus::Completed,
            shares: session.shares.len() as u32,
        });
        ctx.response_mut().add_event(WithdrawalStatusEvent {
            withdrawal_id: withdrawal.withdrawal_id,
            status: WithdrawalStatus::Signed,
        });
        Ok(())
    }

    fn timeout_session(&self, ctx: &mut StateContext, session: &mut TssSession) -> Result<()> {
        session.status = SessionStatus::Timeout;
        SESSION_TIMEOUTS.remove(
            ctx.storage,
            (session.timeout_at.seconds(), session.session_id),
        );

        let mut withdrawal = self.load_withdrawal(ctx.storage, session.withdrawal_id)?;
        if withdrawal.status == WithdrawalStatus::Signing {
            withdrawal.status = WithdrawalStatus::Timeout;
            WITHDRAWALS.save(ctx.storage, withdrawal.withdrawal_id, &withdrawal)?;
            ctx.response_mut().add_event(WithdrawalStatusEvent {
                withdrawal_id: withdrawal.withdrawal_id,
                status: WithdrawalStatus::Timeout,
            });
        }

        ctx.response_mut().add_event(SessionClosedEvent {
            session_id: session.session_id,
            status: SessionStatus::Timeout,
            shares: session.shares.len() as u32,
        });
        Ok(())
    }

    /// Times out live sessions whose deadline passed without threshold.
    fn sweep_session_timeouts(&self, ctx: &mut StateContext) -> Result<()> {
        let due: Vec<SessionId> = SESSION_TIMEOUTS
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::exclusive(self.now().seconds())),
                Order::Ascending,
            )
            .map(|res| res.map(|((_, id), ())| id))
            .collect::<Result<_, _>>()?;

        for session_id in due {
            let mut session = TSS_SESSIONS
                .may_load(ctx.storage, session_id)?
                .context("session timeout index out of step")?;
            if session.status.is_terminal() {
                SESSION_TIMEOUTS.remove(
                    ctx.storage,
                    (session.timeout_at.seconds(), session_id),
                );
                continue;
            }
            self.timeout_session(ctx, &mut session)?;
            TSS_SESSIONS.save(ctx.storage, session_id, &session)?;
        }
        Ok(())
    }

    /// Returns the full escrow of a failed or timed-out withdrawal.
    pub(crate) fn refund_withdrawal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        withdrawal_id: WithdrawalId,
    ) -> Result<()> {
        let mut withdrawal = self.load_withdrawal(ctx.storage, withdrawal_id)?;
        platform_ensure!(
            &withdrawal.sender == sender || sender == &self.config.governance,
            ErrorId::Unauthorized,
            ErrorDomain::Bridge,
            "{sender} may not refund withdrawal {withdrawal_id}"
        );
        platform_ensure!(
            withdrawal.status.refundable(),
            ErrorId::WithdrawalNotReady,
            ErrorDomain::Bridge,
            "withdrawal {withdrawal_id} is {} and cannot be refunded",
            withdrawal.status
        );

        let asset_cfg = CHAIN_ASSETS
            .may_load(ctx.storage, (&withdrawal.chain_id, &withdrawal.asset))?
            .context("asset config vanished")?;
        // the full escrow returns; no fee is retained on the refund path
        self.bank.send_from_module(
            ctx.storage,
            module::BRIDGE,
            &withdrawal.sender,
            &asset_cfg.internal_denom,
            withdrawal.internal_amount,
        )?;

        withdrawal.status = WithdrawalStatus::Refunded;
        WITHDRAWALS.save(ctx.storage, withdrawal_id, &withdrawal)?;
        ctx.response_mut().add_event(WithdrawalStatusEvent {
            withdrawal_id,
            status: WithdrawalStatus::Refunded,
        });
        Ok(())
    }

    // administration

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update_circuit_breaker(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        enabled: bool,
        reason: Option<String>,
        allow_deposit: bool,
        allow_withdraw: bool,
        allow_attest: bool,
        expires_at: Option<Timestamp>,
    ) -> Result<()> {
        let breaker = CircuitBreaker {
            enabled,
            reason: reason.clone(),
            triggered_by: enabled.then(|| sender.clone()),
            allow_deposit,
            allow_withdraw,
            allow_attest,
            expires_at,
        };
        CIRCUIT.save(ctx.storage, &breaker)?;
        ctx.response_mut()
            .add_event(CircuitBreakerEvent { enabled, reason });
        Ok(())
    }

    /// EndBlock step: clear a breaker whose expiry has passed.
    pub(crate) fn sweep_circuit_breaker(&self, ctx: &mut StateContext) -> Result<()> {
        let breaker = self.circuit_breaker(ctx.storage)?;
        if breaker.lapsed(self.now()) {
            CIRCUIT.save(ctx.storage, &CircuitBreaker::default())?;
            ctx.response_mut().add_event(CircuitBreakerEvent {
                enabled: false,
                reason: Some("expired".to_owned()),
            });
        }
        Ok(())
    }

    pub(crate) fn add_external_chain(
        &self,
        ctx: &mut StateContext,
        chain: ExternalChain,
    ) -> Result<()> {
        platform_ensure!(
            !chain.chain_id.is_empty() && chain.min_deposit <= chain.max_deposit,
            ErrorId::ChainNotSupported,
            ErrorDomain::Bridge,
            "invalid chain parameters"
        );
        let chain_id = chain.chain_id.clone();
        CHAINS.save(ctx.storage, &chain_id, &chain)?;
        ctx.response_mut()
            .add_event(Event::new("chain-added").add_attribute(event_key::CHAIN, chain_id));
        Ok(())
    }

    pub(crate) fn add_external_asset(
        &self,
        ctx: &mut StateContext,
        asset: ExternalAsset,
    ) -> Result<()> {
        platform_ensure!(
            CHAINS.has(ctx.storage, &asset.chain_id),
            ErrorId::ChainNotSupported,
            ErrorDomain::Bridge,
            "chain {} is not registered",
            asset.chain_id
        );
        platform_ensure!(
            !asset.conversion_rate.is_zero() && !asset.internal_denom.is_empty(),
            ErrorId::AssetNotSupported,
            ErrorDomain::Bridge,
            "invalid asset parameters"
        );
        let chain_id = asset.chain_id.clone();
        let symbol = asset.asset.clone();
        CHAIN_ASSETS.save(ctx.storage, (&chain_id, &symbol), &asset)?;
        ctx.response_mut().add_event(
            Event::new("asset-added")
                .add_attribute(event_key::CHAIN, chain_id)
                .add_attribute(event_key::ASSET, symbol),
        );
        Ok(())
    }
}

/// Deterministic serialisation of what a session signs.
fn signing_message(withdrawal: &Withdrawal) -> Result<Binary> {
    let payload = (
        withdrawal.withdrawal_id.u64(),
        withdrawal.chain_id.as_str(),
        withdrawal.recipient.as_str(),
        withdrawal.external_amount.u128(),
    );
    Ok(Binary::from(serde_json::to_vec(&payload)?))
}
