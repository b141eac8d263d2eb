//! 並列タスクグループ
//!
//! グループ内のタスクは1つのキャンセルトークンを共有する。
//! 最初に失敗したタスクのエラーだけを保持してトークンをキャンセルし、
//! 全タスクの終了を待ってからそのエラーを返す。

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct TaskGroup<E> {
    tasks: JoinSet<()>,
    token: CancellationToken,
    first_error: Arc<Mutex<Option<E>>>,
}

impl<E: Send + 'static> TaskGroup<E> {
    /// `parent` の子トークンを持つグループを作成
    ///
    /// 親のキャンセルはグループに伝播するが、グループのキャンセルは親に伝播しない。
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token: parent.child_token(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// グループで共有されるキャンセルトークン
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);

        self.tasks.spawn(async move {
            if let Err(err) = task.await {
                {
                    let mut slot = first_error
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
                token.cancel();
            }
        });
    }

    /// 全タスクの終了を待ち、最初のエラーがあれば返す
    ///
    /// タスクが panic した場合は残りのタスクをキャンセルして待った後、panic を再送出する。
    pub async fn wait(mut self) -> Result<(), E> {
        let mut panic = None;

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(join_err) = joined
                && join_err.is_panic()
            {
                self.token.cancel();
                panic.get_or_insert(join_err.into_panic());
            }
        }

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        let first = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
