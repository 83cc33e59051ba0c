//! # 令牌性能基准测试
//!
//! 使用 Criterion 测量访问令牌签发、校验和刷新令牌兑换

use std::hint::black_box;
use std::time::Duration;

use chirpy_auth::auth::{Headers, TokenIssuer, TokenValidator};
use chirpy_auth::config::SigningSecret;
use chirpy_auth::{AuthConfig, AuthService};
use criterion::{Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use uuid::Uuid;

/// 访问令牌签发
fn bench_issue(c: &mut Criterion) {
    let issuer = TokenIssuer::new(&SigningSecret::from("benchmark-secret"));
    let user_id = Uuid::new_v4();

    c.bench_function("access_token_issue", |b| {
        b.iter(|| {
            issuer
                .issue(black_box(user_id), Duration::from_secs(3600))
                .unwrap()
        });
    });
}

/// 访问令牌校验
fn bench_validate(c: &mut Criterion) {
    let secret = SigningSecret::from("benchmark-secret");
    let issuer = TokenIssuer::new(&secret);
    let validator = TokenValidator::new(&secret);
    let token = issuer
        .issue(Uuid::new_v4(), Duration::from_secs(3600))
        .unwrap();

    c.bench_function("access_token_validate", |b| {
        b.iter(|| validator.validate(black_box(&token)).unwrap());
    });
}

/// 刷新令牌兑换 (内存存储)
fn bench_refresh_exchange(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = AuthService::in_memory(&AuthConfig::new("benchmark-secret", "polka-key")).unwrap();
    let token = rt
        .block_on(service.refresh_tokens().issue(Uuid::new_v4()))
        .unwrap();
    let headers: Headers = [("Authorization", format!("Bearer {token}"))]
        .into_iter()
        .collect();

    c.bench_function("refresh_token_exchange", |b| {
        b.iter(|| rt.block_on(service.refresh(black_box(&headers))).unwrap());
    });
}

criterion_group!(benches, bench_issue, bench_validate, bench_refresh_exchange);
criterion_main!(benches);
