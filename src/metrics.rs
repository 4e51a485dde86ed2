use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "contact_chat_messages_sent_total",
        "Messages accepted and persisted",
    )
    .expect("failed to create contact_chat_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register contact_chat_messages_sent_total");
    counter
});

static PUSH_DELIVERIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "contact_chat_push_deliveries_total",
        "Realtime pushes delivered to live connections",
    )
    .expect("failed to create contact_chat_push_deliveries_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register contact_chat_push_deliveries_total");
    counter
});

static PUSH_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "contact_chat_push_dropped_total",
        "Pushes dropped because the recipient had no live connection",
    )
    .expect("failed to create contact_chat_push_dropped_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register contact_chat_push_dropped_total");
    counter
});

static CONTACT_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "contact_chat_contact_transitions_total",
            "Contact lifecycle transitions applied",
        ),
        &["transition"],
    )
    .expect("failed to create contact_chat_contact_transitions_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register contact_chat_contact_transitions_total");
    counter
});

pub fn observe_message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

pub fn observe_push(delivered: usize) {
    if delivered == 0 {
        PUSH_DROPPED_TOTAL.inc();
    } else {
        PUSH_DELIVERIES_TOTAL.inc_by(delivered as u64);
    }
}

pub fn observe_contact_transition(transition: &str) {
    CONTACT_TRANSITIONS_TOTAL
        .with_label_values(&[transition])
        .inc();
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
