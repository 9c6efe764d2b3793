use criterion::{black_box, criterion_group, criterion_main, Criterion};
use caze_bot::twitter::oauth::{parameter_string, signature_base_string};
use caze_bot::twitter::stream::LineBuffer;
use caze_bot::StreamMessage;

const TWEET: &str = r#"{"id":12345,"id_str":"12345","text":"@caze_bot show me the picture","user":{"id":7,"id_str":"7","screen_name":"alice","name":"Alice"},"entities":{"user_mentions":[{"screen_name":"caze_bot"}]},"lang":"en"}"#;
const WARNING: &str =
    r#"{"warning":{"code":"FALLING_BEHIND","message":"Your connection is falling behind","percent_full":60}}"#;

fn line_buffer_benchmark(c: &mut Criterion) {
    let body = format!("{}\r\n\r\n{}\r\n", TWEET, WARNING).repeat(32);
    let chunks: Vec<&[u8]> = body.as_bytes().chunks(512).collect();

    c.bench_function("line_buffer_split_chunked_body", |b| {
        b.iter(|| {
            let mut buf = LineBuffer::new();
            let mut count = 0;
            for chunk in &chunks {
                count += buf.push(black_box(chunk)).len();
            }
            black_box(count);
        });
    });
}

fn decode_benchmark(c: &mut Criterion) {
    c.bench_function("decode_tweet_message", |b| {
        b.iter(|| {
            let message = StreamMessage::decode(black_box(TWEET)).unwrap();
            black_box(message.kind());
        });
    });

    c.bench_function("decode_stall_warning", |b| {
        b.iter(|| {
            let message = StreamMessage::decode(black_box(WARNING)).unwrap();
            black_box(message.kind());
        });
    });
}

fn signing_benchmark(c: &mut Criterion) {
    let params: Vec<(String, String)> = vec![
        ("status".into(), "@alice".into()),
        ("in_reply_to_status_id".into(), "12345".into()),
        ("media_ids".into(), "999".into()),
        ("oauth_consumer_key".into(), "xvz1evFS4wEEPTGEFPHBog".into()),
        ("oauth_nonce".into(), "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".into()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), "1318622958".into()),
        ("oauth_version".into(), "1.0".into()),
    ];

    c.bench_function("oauth_signature_base_string", |b| {
        b.iter(|| {
            let base = signature_base_string(
                "POST",
                black_box("https://api.twitter.com/1.1/statuses/update.json"),
                black_box(&params),
            );
            black_box(parameter_string(&params).len() + base.len());
        });
    });
}

criterion_group!(
    stream_decoding,
    line_buffer_benchmark,
    decode_benchmark,
    signing_benchmark
);
criterion_main!(stream_decoding);
