//! One-way proxies: fresh client per call, always released.

mod common;

use std::time::Duration;

use codenames_client::services::authentication::{
    Authentication, AuthenticationRequest, AuthenticationResponse,
};
use codenames_client::services::email::{Email, EmailRequest};
use codenames_client::services::moderation::Moderation;
use codenames_client::services::users::{Users, UsersRequest, UsersResponse};
use codenames_client::testing::MockOneWayFactory;
use codenames_client::{
    AuthenticationProxy, EmailProxy, ModerationProxy, Player, PlayerReport, ServiceReply,
    StatusCode, TransportError, User, UserId, UsersProxy,
};
use common::{init_tracing, player, test_config};

fn user() -> User {
    User {
        user_id: UserId::default(),
        email: "falcon@example.com".into(),
        password: "s3cret!".into(),
    }
}

fn report() -> PlayerReport {
    PlayerReport {
        reporter: player("p-1"),
        reported: player("p-2"),
        reason: "offensive clues".into(),
    }
}

fn authentication_factory() -> MockOneWayFactory<Authentication> {
    let factory = MockOneWayFactory::<Authentication>::new();
    factory.respond_with(|request| match request {
        AuthenticationRequest::Login(user) if user.password == "s3cret!" => {
            AuthenticationResponse::Player(Player::new("p-1", "falcon"))
        }
        AuthenticationRequest::Login(_) => {
            AuthenticationResponse::Reply(ServiceReply::rejected(StatusCode::Unauthorized))
        }
        _ => AuthenticationResponse::Reply(ServiceReply::ok()),
    });
    factory
}

#[tokio::test]
async fn test_each_call_uses_and_closes_a_fresh_client() {
    init_tracing();
    let factory = authentication_factory();
    let proxy = AuthenticationProxy::new(factory.clone().into_dyn(), test_config());

    let logged_in = proxy.login(&user()).await;
    assert!(logged_in.is_success());
    assert_eq!(logged_in.payload().map(|p| p.username.as_str()), Some("falcon"));
    assert!(proxy.begin_password_reset("falcon@example.com").await.is_success());
    assert!(
        proxy
            .complete_password_reset("falcon@example.com", "123456", "n3w!")
            .await
            .is_success()
    );
    assert!(
        proxy
            .update_password("falcon@example.com", "s3cret!", "n3w!")
            .await
            .is_success()
    );

    let counters = factory.counters();
    assert_eq!(counters.creates(), 4);
    assert_eq!(counters.calls(), 4);
    assert_eq!(counters.closes(), 4);
    assert_eq!(counters.aborts(), 0);
}

#[tokio::test]
async fn test_refused_login_carries_server_code() {
    let factory = authentication_factory();
    let proxy = AuthenticationProxy::new(factory.clone().into_dyn(), test_config());

    let mut wrong = user();
    wrong.password = "guess".into();
    let result = proxy.login(&wrong).await;
    assert_eq!(result.status_code(), StatusCode::Unauthorized);
    assert_eq!(result.payload(), None);
    assert_eq!(factory.counters().closes(), 1);
}

#[tokio::test]
async fn test_failures_are_classified_and_client_released() {
    let cases = [
        (
            TransportError::Timeout(Duration::from_millis(500)),
            StatusCode::ServerTimeout,
        ),
        (
            TransportError::EndpointNotFound("net.tcp://auth".into()),
            StatusCode::ServerUnreachable,
        ),
        (
            TransportError::Communication("reset".into()),
            StatusCode::ServerUnavailable,
        ),
        (
            TransportError::Service("database down".into()),
            StatusCode::ServerError,
        ),
        (
            TransportError::Unexpected("bad frame".into()),
            StatusCode::ClientError,
        ),
    ];

    for (error, expected) in cases {
        let factory = authentication_factory();
        factory.fail_next_call(error);
        let proxy = AuthenticationProxy::new(factory.clone().into_dyn(), test_config());

        let result = proxy.begin_password_reset("falcon@example.com").await;
        assert_eq!(result.status_code(), expected);
        assert_eq!(factory.counters().closes(), 1);
    }
}

#[tokio::test]
async fn test_moderation_reports_unclassified_failure_as_server_error() {
    let factory = MockOneWayFactory::<Moderation>::new();
    factory.respond_with(|_| ServiceReply::ok());
    let proxy = ModerationProxy::new(factory.clone().into_dyn(), test_config());

    assert!(proxy.report_player(&report()).await.is_success());

    factory.fail_next_call(TransportError::Unexpected("bad frame".into()));
    assert_eq!(
        proxy.report_player(&report()).await.status_code(),
        StatusCode::ServerError
    );

    // Recognized failures keep their usual codes
    factory.fail_next_call(TransportError::Timeout(Duration::from_millis(500)));
    assert_eq!(
        proxy.report_player(&report()).await.status_code(),
        StatusCode::ServerTimeout
    );
    assert_eq!(factory.counters().closes(), 3);
}

#[tokio::test]
async fn test_self_report_is_refused_locally() {
    let factory = MockOneWayFactory::<Moderation>::new();
    let proxy = ModerationProxy::new(factory.clone().into_dyn(), test_config());

    let mut own = report();
    own.reported = own.reporter.clone();
    assert_eq!(
        proxy.report_player(&own).await.status_code(),
        StatusCode::Unauthorized
    );
    assert_eq!(factory.counters().creates(), 0);
}

#[tokio::test]
async fn test_missing_data_creates_no_client() {
    let auth = authentication_factory();
    let auth_proxy = AuthenticationProxy::new(auth.clone().into_dyn(), test_config());
    let email = MockOneWayFactory::<Email>::new();
    let email_proxy = EmailProxy::new(email.clone().into_dyn(), test_config());

    let mut blank = user();
    blank.email = "  ".into();
    assert_eq!(auth_proxy.login(&blank).await.status_code(), StatusCode::MissingData);
    assert_eq!(
        auth_proxy.begin_password_reset("").await.status_code(),
        StatusCode::MissingData
    );
    assert_eq!(
        email_proxy
            .validate_verification_code("falcon@example.com", " ")
            .await
            .status_code(),
        StatusCode::MissingData
    );
    assert_eq!(auth.counters().creates(), 0);
    assert_eq!(email.counters().creates(), 0);
}

#[tokio::test]
async fn test_client_creation_failure_is_classified() {
    let factory = MockOneWayFactory::<Email>::new();
    factory.fail_next_create(TransportError::EndpointNotFound("net.tcp://email".into()));
    let proxy = EmailProxy::new(factory.clone().into_dyn(), test_config());

    let result = proxy.send_verification_code("falcon@example.com").await;
    assert_eq!(result.status_code(), StatusCode::ServerUnreachable);
    assert_eq!(factory.counters().calls(), 0);
}

#[tokio::test]
async fn test_failed_close_falls_back_to_abort() {
    let factory = MockOneWayFactory::<Email>::new();
    factory.respond_with(|_| ServiceReply::ok());
    factory.fail_closes(TransportError::Faulted("channel faulted".into()));
    let proxy = EmailProxy::new(factory.clone().into_dyn(), test_config());

    assert!(proxy.send_verification_code("falcon@example.com").await.is_success());
    assert_eq!(factory.counters().closes(), 1);
    assert_eq!(factory.counters().aborts(), 1);
}

#[tokio::test]
async fn test_verification_code_is_trimmed() {
    let factory = MockOneWayFactory::<Email>::new();
    factory.respond_with(|request| match request {
        EmailRequest::ValidateVerificationCode { code, .. } if code == "123456" => {
            ServiceReply::ok()
        }
        _ => ServiceReply::rejected(StatusCode::Unauthorized),
    });
    let proxy = EmailProxy::new(factory.clone().into_dyn(), test_config());

    assert!(
        proxy
            .validate_verification_code("falcon@example.com", " 123456 ")
            .await
            .is_success()
    );
    assert_eq!(
        proxy
            .validate_verification_code("falcon@example.com", "000000")
            .await
            .status_code(),
        StatusCode::Unauthorized
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_call_times_out_and_releases_client() {
    let factory = MockOneWayFactory::<Email>::new();
    factory.stall_calls(true);
    let proxy = EmailProxy::new(factory.clone().into_dyn(), test_config());

    let result = proxy.send_verification_code("falcon@example.com").await;
    assert_eq!(result.status_code(), StatusCode::ServerTimeout);
    assert_eq!(factory.counters().closes(), 1);
    assert_eq!(factory.counters().aborts(), 0);
}

#[tokio::test]
async fn test_abandoned_call_aborts_client() {
    let factory = MockOneWayFactory::<Email>::new();
    factory.stall_calls(true);
    let proxy = EmailProxy::new(factory.clone().into_dyn(), test_config());

    let call =
        tokio::spawn(async move { proxy.send_verification_code("falcon@example.com").await });
    while factory.counters().calls() == 0 {
        tokio::task::yield_now().await;
    }
    call.abort();
    assert!(call.await.expect_err("aborted").is_cancelled());

    assert_eq!(factory.counters().closes(), 0);
    assert_eq!(factory.counters().aborts(), 1);
}

#[tokio::test]
async fn test_users_profile_round_trip() {
    let factory = MockOneWayFactory::<Users>::new();
    factory.respond_with(|request| match request {
        UsersRequest::GetPlayerByUserId { user_id } if user_id.as_str() == "u-1" => {
            UsersResponse::Player(Some(Player::new("p-1", "falcon")))
        }
        UsersRequest::GetPlayerByUserId { .. } => UsersResponse::Player(None),
        _ => UsersResponse::Reply(ServiceReply::ok()),
    });
    let proxy = UsersProxy::new(factory.clone().into_dyn(), test_config());

    assert!(proxy.sign_in(&user(), &Player::new("", "falcon")).await.is_success());
    let found = proxy.get_player_by_user_id(&UserId::from("u-1")).await;
    assert_eq!(found.map(|p| p.player_id), Some(player("p-1")));
    assert_eq!(proxy.get_player_by_user_id(&UserId::from("u-2")).await, None);
    assert_eq!(proxy.get_player_by_user_id(&UserId::default()).await, None);

    let mut profile = Player::new("p-1", "falcon");
    profile.description = "spy master at heart".into();
    assert!(proxy.update_profile(&profile).await.is_success());
    assert_eq!(
        proxy.update_profile(&Player::default()).await.status_code(),
        StatusCode::MissingData
    );

    assert_eq!(factory.counters().creates(), 4);
    assert_eq!(factory.counters().closes(), 4);
    match &factory.requests()[3] {
        UsersRequest::UpdateProfile(saved) => assert_eq!(saved.description, "spy master at heart"),
        other => panic!("expected UpdateProfile, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_player_failure_is_none() {
    let factory = MockOneWayFactory::<Users>::new();
    factory.fail_next_call(TransportError::Communication("reset".into()));
    let proxy = UsersProxy::new(factory.clone().into_dyn(), test_config());

    assert_eq!(proxy.get_player_by_user_id(&UserId::from("u-1")).await, None);
    assert_eq!(factory.counters().closes(), 1);
}
