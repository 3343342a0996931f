mod support;

use std::time::Duration;

use domain::UserRole;
use reqwest::Client;
use serde_json::json;
use support::{
    assert_no_event, authenticate, connect_ws, recv_until, send_event, TestApp, WsStream,
};

struct CallSetup {
    /// 握在手里防止服务提前关停
    _app: TestApp,
    ws_student: WsStream,
    ws_advisor: WsStream,
    student_id: String,
    advisor_id: String,
    room_id: String,
}

async fn setup() -> CallSetup {
    let app = TestApp::spawn().await;
    let (student_id, student_token) = app.seed_user("Amina", UserRole::Student).await;
    let (advisor_id, advisor_token) = app.seed_user("Dr. Osei", UserRole::Advisor).await;

    let room = Client::new()
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"participantId": advisor_id.to_string()}))
        .send()
        .await
        .expect("create room")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    let room_id = room["id"].as_str().unwrap().to_string();

    // 房间在认证前就存在，连接认证时自动订阅它的扇出
    let mut ws_student = connect_ws(&app).await;
    authenticate(&mut ws_student, &student_token).await;
    let mut ws_advisor = connect_ws(&app).await;
    authenticate(&mut ws_advisor, &advisor_token).await;

    CallSetup {
        _app: app,
        ws_student,
        ws_advisor,
        student_id: student_id.to_string(),
        advisor_id: advisor_id.to_string(),
        room_id,
    }
}

/// 端到端：发起视频通话 → 来电 → 接听 → 挂断，时长落库
#[tokio::test]
async fn video_call_lifecycle() {
    let mut s = setup().await;

    // 学生发起视频通话；payload 里的 receiverId 只是客户端的猜测，
    // 服务端始终按房间另一位参与者计算被叫方
    send_event(
        &mut s.ws_student,
        json!({"event": "call_initiate", "data": {
            "chatRoomId": s.room_id,
            "type": "video",
            "receiverId": s.advisor_id,
        }}),
    )
    .await;

    // 导师收到来电
    let incoming = recv_until(&mut s.ws_advisor, "call_incoming").await;
    let call = &incoming["data"]["call"];
    assert_eq!(call["status"], "ringing");
    assert_eq!(call["type"], "video");
    assert_eq!(call["initiatorId"], s.student_id);
    assert_eq!(call["participantId"], s.advisor_id);
    let call_id = call["id"].as_str().unwrap().to_string();

    // 发起方也能看到自己的 call_incoming（房间广播）
    recv_until(&mut s.ws_student, "call_incoming").await;

    // 被叫方接听，双方都收到 call_accepted，状态 active、接通时间已写入
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_accept", "data": {"callId": call_id}}),
    )
    .await;
    let accepted_a = recv_until(&mut s.ws_student, "call_accepted").await;
    let accepted_b = recv_until(&mut s.ws_advisor, "call_accepted").await;
    for accepted in [&accepted_a, &accepted_b] {
        assert_eq!(accepted["data"]["call"]["status"], "active");
        assert!(accepted["data"]["call"]["startedAt"].is_string());
    }

    // 挂断，双方都收到 call_ended，时长按整秒派生
    send_event(
        &mut s.ws_student,
        json!({"event": "call_end", "data": {"callId": call_id}}),
    )
    .await;
    let ended_a = recv_until(&mut s.ws_student, "call_ended").await;
    let ended_b = recv_until(&mut s.ws_advisor, "call_ended").await;
    for ended in [&ended_a, &ended_b] {
        assert_eq!(ended["data"]["call"]["status"], "ended");
        assert!(ended["data"]["call"]["durationSeconds"].as_i64().unwrap() >= 0);
        assert!(ended["data"]["call"]["endedAt"].is_string());
    }

    // 重复挂断是无害覆盖，不报错
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_end", "data": {"callId": call_id}}),
    )
    .await;
    recv_until(&mut s.ws_advisor, "call_ended").await;

    // 通话结束后 accept 无效：没有广播，只有调用方自己的错误
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_accept", "data": {"callId": call_id}}),
    )
    .await;
    let error = recv_until(&mut s.ws_advisor, "error").await;
    assert_eq!(error["data"]["code"], "NOT_FOUND_OR_FORBIDDEN");
    assert_no_event(&mut s.ws_student, "call_accepted", Duration::from_millis(300)).await;
}

/// 拒接从 ringing 直接短路到 ended，任何一方都可以拒
#[tokio::test]
async fn reject_short_circuits_ringing_call() {
    let mut s = setup().await;

    // 导师发起语音通话
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_initiate", "data": {
            "chatRoomId": s.room_id,
            "type": "voice",
            "receiverId": s.student_id,
        }}),
    )
    .await;
    let incoming = recv_until(&mut s.ws_student, "call_incoming").await;
    let call_id = incoming["data"]["call"]["id"].as_str().unwrap().to_string();

    // 发起方自己拒接——reject 有意不做身份过滤
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_reject", "data": {"callId": call_id}}),
    )
    .await;

    let rejected_a = recv_until(&mut s.ws_student, "call_rejected").await;
    let rejected_b = recv_until(&mut s.ws_advisor, "call_rejected").await;
    for rejected in [&rejected_a, &rejected_b] {
        assert_eq!(rejected["data"]["call"]["status"], "ended");
        // 从未接通，不产生时长
        assert!(rejected["data"]["call"]["durationSeconds"].is_null());
    }

    // 被拒的通话不能再接听
    send_event(
        &mut s.ws_student,
        json!({"event": "call_accept", "data": {"callId": call_id}}),
    )
    .await;
    let error = recv_until(&mut s.ws_student, "error").await;
    assert_eq!(error["data"]["code"], "NOT_FOUND_OR_FORBIDDEN");
}

/// 只有被叫方能接听：发起方自己 accept 不产生任何效果
#[tokio::test]
async fn initiator_cannot_accept_own_call() {
    let mut s = setup().await;

    send_event(
        &mut s.ws_student,
        json!({"event": "call_initiate", "data": {
            "chatRoomId": s.room_id,
            "type": "video",
            "receiverId": s.advisor_id,
        }}),
    )
    .await;
    let incoming = recv_until(&mut s.ws_student, "call_incoming").await;
    let call_id = incoming["data"]["call"]["id"].as_str().unwrap().to_string();

    send_event(
        &mut s.ws_student,
        json!({"event": "call_accept", "data": {"callId": call_id}}),
    )
    .await;
    let error = recv_until(&mut s.ws_student, "error").await;
    assert_eq!(error["data"]["code"], "NOT_FOUND_OR_FORBIDDEN");

    // 对端只看到过 call_incoming，没有 call_accepted
    recv_until(&mut s.ws_advisor, "call_incoming").await;
    assert_no_event(&mut s.ws_advisor, "call_accepted", Duration::from_millis(300)).await;

    // 正主接听依然有效
    send_event(
        &mut s.ws_advisor,
        json!({"event": "call_accept", "data": {"callId": call_id}}),
    )
    .await;
    let accepted = recv_until(&mut s.ws_advisor, "call_accepted").await;
    assert_eq!(accepted["data"]["call"]["status"], "active");
}
