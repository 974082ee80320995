use std::fs;

use chrono::Utc;
use tracing::{info, warn};
use trust_ledger::{write_atomic, Block, Ledger};
use trust_types::{AlertLevel, Amount, Movement};

use crate::config::DeskConfig;
use crate::error::{DeskError, Result};
use crate::requests::{Request, RequestSource};
use crate::site::{self, PortalView};
use crate::state::DeskState;

/// Outcome of [`Desk::disburse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disbursement {
    /// The ledger entry recording the payout.
    pub block: Block,
    /// `false` when the entry already existed and only the acknowledgement
    /// was retried.
    pub appended: bool,
    /// `false` when the payout is committed but the portal could not be
    /// rewritten; a later `render` catches up.
    pub rendered: bool,
}

/// The operator's desk: ledger, state file, request source and portal.
pub struct Desk<S> {
    config: DeskConfig,
    ledger: Ledger,
    inbox: S,
}

impl<S: RequestSource> Desk<S> {
    /// Open (or create) the ledger and attach a request source.
    pub fn open(config: DeskConfig, inbox: S) -> Result<Self> {
        let ledger = Ledger::open_or_create(config.ledger.clone())?;
        Ok(Self::with_ledger(config, ledger, inbox))
    }

    pub fn with_ledger(config: DeskConfig, ledger: Ledger, inbox: S) -> Self {
        Self {
            config,
            ledger,
            inbox,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn inbox(&self) -> &S {
        &self.inbox
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn state(&self) -> Result<DeskState> {
        DeskState::load(&self.config.state_path)
    }

    /// Opening balance plus every movement on the chain.
    pub fn balance(&self) -> Result<Amount> {
        self.state()?.balance(&self.ledger.movements()?)
    }

    /// Publish a communiqué. Returns `false` for a blank message.
    pub fn post_news(&self, msg: &str) -> Result<bool> {
        let mut state = self.state()?;
        if !state.post_news(msg, Utc::now(), self.config.news_limit) {
            return Ok(false);
        }
        state.save(&self.config.state_path)?;
        info!(news = state.news.len(), "communiqué posted");
        self.render_with(&state)?;
        Ok(true)
    }

    /// Returns `false` if the desk was already at `level`.
    pub fn set_alert(&self, level: AlertLevel) -> Result<bool> {
        let mut state = self.state()?;
        if !state.set_alert(level) {
            return Ok(false);
        }
        state.save(&self.config.state_path)?;
        info!(%level, "alert level changed");
        self.render_with(&state)?;
        Ok(true)
    }

    pub fn open_requests(&self) -> Result<Vec<Request>> {
        self.inbox.open_requests()
    }

    /// Pay out `amount` against request `id` and acknowledge the request.
    ///
    /// The ledger entry is written before the acknowledgement. If the
    /// acknowledgement fails the error is returned and the entry stays; a
    /// later call (or [`Desk::reconcile`]) sees the entry and retries only
    /// the acknowledgement, so the payout is never recorded twice. A failed
    /// portal render after that point is logged and reported through
    /// [`Disbursement::rendered`], not returned as an error.
    pub fn disburse(&self, id: u64, amount: Amount) -> Result<Disbursement> {
        if !amount.is_positive() {
            return Err(DeskError::InvalidAmount(amount));
        }

        let open = self.inbox.open_requests()?.into_iter().find(|r| r.id == id);
        let recorded = self.ledger.find_request(id)?;

        let (block, appended) = match (recorded, open) {
            (Some(block), Some(_)) => {
                let requested = -amount;
                if block.data.amount() != Some(requested) {
                    warn!(
                        id,
                        recorded = ?block.data.amount(),
                        %requested,
                        "request already recorded with a different amount; keeping the ledger entry"
                    );
                }
                info!(id, index = block.index, "payout already on ledger; retrying acknowledgement");
                (block, false)
            }
            (Some(_), None) => return Err(DeskError::RequestClosed(id)),
            (None, Some(request)) => {
                let movement = Movement::new(request.title.to_uppercase(), -amount).for_request(id);
                let block = self.ledger.append(movement)?;
                info!(id, index = block.index, amount = %amount, "disbursement recorded");
                (block, true)
            }
            (None, None) => return Err(DeskError::RequestNotFound(id)),
        };

        self.inbox.acknowledge(id)?;
        let rendered = match self.render() {
            Ok(()) => true,
            Err(e) => {
                warn!(id, index = block.index, error = %e, "disbursement committed but portal render failed");
                false
            }
        };
        Ok(Disbursement {
            block,
            appended,
            rendered,
        })
    }

    /// Acknowledge every open request that already has a ledger entry.
    ///
    /// Returns the ids acknowledged. Stops at the first failure.
    pub fn reconcile(&self) -> Result<Vec<u64>> {
        let mut acknowledged = Vec::new();
        for request in self.inbox.open_requests()? {
            if self.ledger.find_request(request.id)?.is_some() {
                self.inbox.acknowledge(request.id)?;
                info!(id = request.id, "stale request acknowledged");
                acknowledged.push(request.id);
            }
        }
        Ok(acknowledged)
    }

    /// Regenerate the portal and explorer pages.
    pub fn render(&self) -> Result<()> {
        let state = self.state()?;
        self.render_with(&state)
    }

    fn render_with(&self, state: &DeskState) -> Result<()> {
        let blocks = self.ledger.blocks()?;
        let tip = blocks.last().ok_or_else(|| {
            DeskError::Storage(trust_ledger::StorageError::Empty(self.config.ledger.path.clone()))
        })?;
        let history: Vec<Block> = blocks
            .iter()
            .rev()
            .take(self.config.effective_history_limit())
            .cloned()
            .collect();
        let movements: Vec<&Movement> = blocks.iter().filter_map(|b| b.data.as_movement()).collect();
        let rendered_at = Utc::now();

        let portal = site::render_portal(&PortalView {
            site: &self.config.site,
            balance: state.balance(movements)?,
            alert: state.alert,
            news: &state.news,
            history: &history,
            tip,
            rendered_at,
        });
        write_atomic(&self.config.portal_path, portal.as_bytes())?;

        let explorer = site::render_explorer(&self.config.site, &blocks, rendered_at);
        write_atomic(&self.config.explorer_path, explorer.as_bytes())?;

        info!(
            portal = %self.config.portal_path.display(),
            explorer = %self.config.explorer_path.display(),
            blocks = blocks.len(),
            "site rendered"
        );
        Ok(())
    }

    /// Add the explorer link to an existing portal page.
    ///
    /// Returns `false` if the page already links the explorer.
    pub fn link_explorer(&self) -> Result<bool> {
        let path = &self.config.portal_path;
        let html = fs::read_to_string(path).map_err(DeskError::io(path))?;
        match site::patch_explorer_link(&html) {
            Some(patched) => {
                write_atomic(path, patched.as_bytes())?;
                info!(path = %path.display(), "portal linked to explorer");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
