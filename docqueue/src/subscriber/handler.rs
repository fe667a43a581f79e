use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

/// A claimed message handed to consumer logic.
///
/// The handler may change `payload`; in retain mode the changed value is what
/// gets written back. The success flag starts out false and must be set by the
/// handler once its own processing went through.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub payload: T,
    message_id: ObjectId,
    priority: i32,
    processed_successfully: bool,
}

impl<T> Delivery<T> {
    pub fn new(message_id: ObjectId, priority: i32, payload: T) -> Self {
        Self { payload, message_id, priority, processed_successfully: false }
    }

    pub fn message_id(&self) -> ObjectId {
        self.message_id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn processed_successfully(&self) -> bool {
        self.processed_successfully
    }

    pub fn set_processed_successfully(&mut self, success: bool) {
        self.processed_successfully = success;
    }

    pub fn mark_succeeded(&mut self) {
        self.processed_successfully = true;
    }

    pub fn mark_failed(&mut self) {
        self.processed_successfully = false;
    }
}

/// Consumer logic invoked once per claimed message.
///
/// Runs inline in the poll tick: the acknowledgment is written only after
/// `handle` returns.
#[async_trait]
pub trait MessageHandler<T: Send>: Send + Sync {
    async fn handle(&self, delivery: &mut Delivery<T>);
}

/// Adapts a synchronous closure into a [`MessageHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

#[async_trait]
impl<T, F> MessageHandler<T> for FnHandler<F>
where
    T: Send,
    F: Fn(&mut Delivery<T>) + Send + Sync,
{
    async fn handle(&self, delivery: &mut Delivery<T>) {
        (self.0)(delivery)
    }
}
