// Thinking Chain
// Timer-driven sequence of cosmetic reasoning steps shown while a turn runs.
// Each chain is a spawned task cancelled through a oneshot channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::models::chat::{ProcessingStage, ThinkingStep, TurnProgress};

/// Steps appended in order, one per interval
pub const THINKING_STEPS: [&str; 6] = [
    "理解用户问题：分析用户需要查询的时间范围和数据类型",
    "确定数据来源：连接到订单数据库",
    "执行数据查询：提取指定时间范围内的订单数据",
    "数据处理：计算趋势指标，识别异常值",
    "可视化准备：生成趋势图表",
    "结果总结：准备自然语言解释",
];

/// Delay before each step is appended
pub const STEP_INTERVAL: Duration = Duration::from_millis(500);

/// Identifies one started chain. Only the holder of the newest token can stop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainToken(u64);

struct ActiveChain {
    cancel_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ActiveChain {
    async fn cancel(self) {
        // The task may already have finished, closing the receiver
        let _ = self.cancel_tx.send(());
        if let Err(e) = self.handle.await {
            log::warn!("[thinking] Chain task ended abnormally: {}", e);
        }
    }
}

#[derive(Default)]
struct ChainSlot {
    /// Token of the most recently started chain
    generation: u64,
    chain: Option<ActiveChain>,
}

/// Progress of the current turn plus the task advancing it
pub struct ThinkingChain {
    progress: Arc<RwLock<TurnProgress>>,
    slot: Mutex<ChainSlot>,
    interval: Duration,
}

impl Default for ThinkingChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingChain {
    pub fn new() -> Self {
        Self::with_interval(STEP_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            progress: Arc::new(RwLock::new(TurnProgress::default())),
            slot: Mutex::new(ChainSlot::default()),
            interval,
        }
    }

    /// Begin a new chain, cancelling any chain still running
    pub async fn start(&self) -> ChainToken {
        let mut slot = self.slot.lock().await;
        if let Some(prior) = slot.chain.take() {
            log::debug!("[thinking] Cancelling previous chain");
            prior.cancel().await;
        }

        *self.progress.write().await = TurnProgress {
            stage: ProcessingStage::Sending,
            is_generating_thinking: true,
            thinking_chain: Vec::new(),
        };

        slot.generation += 1;
        let token = ChainToken(slot.generation);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run_chain(self.progress.clone(), self.interval, cancel_rx));
        slot.chain = Some(ActiveChain { cancel_tx, handle });
        token
    }

    /// End the chain started with `token`: stage complete, flag cleared,
    /// steps discarded.
    ///
    /// A token superseded by a later `start` is ignored and false returned.
    pub async fn stop(&self, token: ChainToken) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.generation != token.0 {
            log::debug!("[thinking] Ignoring stop for superseded chain");
            return false;
        }
        if let Some(chain) = slot.chain.take() {
            chain.cancel().await;
        }
        *self.progress.write().await = TurnProgress::default();
        true
    }

    /// End whichever chain is running
    pub async fn reset(&self) {
        if let Some(chain) = self.slot.lock().await.chain.take() {
            chain.cancel().await;
        }
        *self.progress.write().await = TurnProgress::default();
    }

    /// Current progress
    pub async fn snapshot(&self) -> TurnProgress {
        self.progress.read().await.clone()
    }

    /// True while a chain task is still appending steps
    pub async fn is_running(&self) -> bool {
        self.slot
            .lock()
            .await
            .chain
            .as_ref()
            .is_some_and(|chain| !chain.handle.is_finished())
    }
}

async fn run_chain(
    progress: Arc<RwLock<TurnProgress>>,
    interval: Duration,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let total = THINKING_STEPS.len();

    for (index, content) in THINKING_STEPS.iter().enumerate() {
        tokio::select! {
            _ = &mut cancel_rx => {
                log::debug!("[thinking] Chain cancelled after {} steps", index);
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let mut progress = progress.write().await;
        progress.thinking_chain.push(ThinkingStep::new(index, *content));

        let appended = index + 1;
        if appended == 1 {
            progress.stage = ProcessingStage::Thinking;
        } else if appended == total - 1 {
            progress.stage = ProcessingStage::Generating;
        }
    }

    log::debug!("[thinking] Chain finished");
}
