mod support;

use std::time::Duration;

use domain::UserRole;
use reqwest::Client;
use serde_json::json;
use support::{
    assert_no_event, authenticate, connect_ws, recv_until, send_event, TestApp,
};
use uuid::Uuid;

/// 端到端：建房 → 发消息 → 对端收到 → 标记已读 → 发送方收到回执通知
#[tokio::test]
async fn chat_message_and_read_receipt_flow() {
    let app = TestApp::spawn().await;
    let (student_id, student_token) = app.seed_user("Amina", UserRole::Student).await;
    let (advisor_id, advisor_token) = app.seed_user("Dr. Osei", UserRole::Advisor).await;
    let client = Client::new();

    // 学生向导师发起联系请求，创建房间
    let room = client
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"participantId": advisor_id.to_string()}))
        .send()
        .await
        .expect("create room")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    let room_id = room["id"].as_str().unwrap().parse::<Uuid>().unwrap();
    assert_eq!(room["studentId"], student_id.to_string());
    assert_eq!(room["advisorId"], advisor_id.to_string());

    // 同一组合再请求一次，从导师侧发起，拿到的还是同一个房间
    let again = client
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", advisor_token))
        .json(&json!({"participantId": student_id.to_string()}))
        .send()
        .await
        .expect("create room again")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    assert_eq!(again["id"], room["id"], "同一组合不能出现第二个房间");

    // 双方建立 socket 连接并认证
    let mut ws_student = connect_ws(&app).await;
    authenticate(&mut ws_student, &student_token).await;
    let mut ws_advisor = connect_ws(&app).await;
    authenticate(&mut ws_advisor, &advisor_token).await;

    // 各自聚焦到房间
    send_event(
        &mut ws_student,
        json!({"event": "join_room", "data": {"chatRoomId": room_id}}),
    )
    .await;
    let joined = recv_until(&mut ws_student, "room_joined").await;
    assert_eq!(joined["data"]["chatRoomId"], room_id.to_string());

    send_event(
        &mut ws_advisor,
        json!({"event": "join_room", "data": {"chatRoomId": room_id}}),
    )
    .await;
    recv_until(&mut ws_advisor, "room_joined").await;

    // 学生发 "Hello"
    send_event(
        &mut ws_student,
        json!({"event": "send_message", "data": {"chatRoomId": room_id, "content": "Hello"}}),
    )
    .await;

    // 导师收到房间广播，发送者是学生
    let received = recv_until(&mut ws_advisor, "message_received").await;
    let message = &received["data"]["message"];
    assert_eq!(message["content"], "Hello");
    assert_eq!(message["sender"]["id"], student_id.to_string());
    assert_eq!(message["receiver"]["id"], advisor_id.to_string());
    let message_id = message["id"].as_str().unwrap().to_string();

    // 发送者同时收到广播和独立的发送确认
    let broadcast = recv_until(&mut ws_student, "message_received").await;
    assert_eq!(broadcast["data"]["message"]["id"], message_id);
    let ack = recv_until(&mut ws_student, "message_sent").await;
    assert_eq!(ack["data"]["messageId"], message_id);
    assert!(ack["data"]["createdAt"].is_string());

    // 导师标记已读
    send_event(
        &mut ws_advisor,
        json!({"event": "mark_as_read", "data": {"chatRoomId": room_id, "messageIds": [message_id]}}),
    )
    .await;

    // 学生收到已读通知
    let read = recv_until(&mut ws_student, "messages_read").await;
    assert_eq!(read["data"]["readerId"], advisor_id.to_string());
    assert_eq!(read["data"]["messageIds"][0], message_id);
    assert!(read["data"]["readAt"].is_string());

    // REST 历史确认 is_read 已经落库
    let history = client
        .get(app.http(&format!("/api/v1/rooms/{}/messages", room_id)))
        .header("authorization", format!("Bearer {}", advisor_token))
        .send()
        .await
        .expect("history")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("history json");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["isRead"], true);
}

/// 编辑/删除的所有权过滤走 REST 路径
#[tokio::test]
async fn edit_and_delete_enforce_ownership() {
    let app = TestApp::spawn().await;
    let (_, student_token) = app.seed_user("Amina", UserRole::Student).await;
    let (advisor_id, advisor_token) = app.seed_user("Dr. Osei", UserRole::Advisor).await;
    let client = Client::new();

    let room = client
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"participantId": advisor_id.to_string()}))
        .send()
        .await
        .expect("create room")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    let room_id = room["id"].as_str().unwrap();

    let mut ws_student = connect_ws(&app).await;
    authenticate(&mut ws_student, &student_token).await;
    send_event(
        &mut ws_student,
        json!({"event": "send_message", "data": {"chatRoomId": room_id, "content": "typo"}}),
    )
    .await;
    let ack = recv_until(&mut ws_student, "message_sent").await;
    let message_id = ack["data"]["messageId"].as_str().unwrap().to_string();

    // 非发送者编辑：404，不区分"不存在"和"不是发送者"
    let forbidden = client
        .put(app.http(&format!("/api/v1/messages/{}", message_id)))
        .header("authorization", format!("Bearer {}", advisor_token))
        .json(&json!({"content": "hijacked"}))
        .send()
        .await
        .expect("edit by non-sender");
    assert_eq!(forbidden.status(), 404);

    // 发送者编辑成功
    let edited = client
        .put(app.http(&format!("/api/v1/messages/{}", message_id)))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"content": "fixed"}))
        .send()
        .await
        .expect("edit by sender")
        .json::<serde_json::Value>()
        .await
        .expect("edited json");
    assert_eq!(edited["content"], "fixed");
    assert_eq!(edited["isEdited"], true);

    // 非发送者删除：静默 204，消息还在
    let resp = client
        .delete(app.http(&format!("/api/v1/messages/{}", message_id)))
        .header("authorization", format!("Bearer {}", advisor_token))
        .send()
        .await
        .expect("delete by non-sender");
    assert_eq!(resp.status(), 204);

    let history = client
        .get(app.http(&format!("/api/v1/rooms/{}/messages", room_id)))
        .header("authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .expect("history")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("history json");
    assert_eq!(history.len(), 1, "非发送者的删除不应该生效");

    // 发送者删除，重复删除同样 204
    for _ in 0..2 {
        let resp = client
            .delete(app.http(&format!("/api/v1/messages/{}", message_id)))
            .header("authorization", format!("Bearer {}", student_token))
            .send()
            .await
            .expect("delete by sender");
        assert_eq!(resp.status(), 204);
    }

    let history = client
        .get(app.http(&format!("/api/v1/rooms/{}/messages", room_id)))
        .header("authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .expect("history")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("history json");
    assert!(history.is_empty());
}

/// 输入指示：开始输入广播给对端，断开连接兜底清理
#[tokio::test]
async fn typing_indicator_flow() {
    let app = TestApp::spawn().await;
    let (student_id, student_token) = app.seed_user("Amina", UserRole::Student).await;
    let (advisor_id, advisor_token) = app.seed_user("Dr. Osei", UserRole::Advisor).await;
    let client = Client::new();

    let room = client
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"participantId": advisor_id.to_string()}))
        .send()
        .await
        .expect("create room")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    let room_id = room["id"].as_str().unwrap();

    let mut ws_student = connect_ws(&app).await;
    authenticate(&mut ws_student, &student_token).await;
    let mut ws_advisor = connect_ws(&app).await;
    authenticate(&mut ws_advisor, &advisor_token).await;

    send_event(
        &mut ws_student,
        json!({"event": "typing_start", "data": {"chatRoomId": room_id}}),
    )
    .await;

    let typing = recv_until(&mut ws_advisor, "user_typing").await;
    assert_eq!(typing["data"]["typing"], true);
    assert_eq!(typing["data"]["userId"], student_id.to_string());

    // 来不及发 typing_stop 就断线：对端必须收敛到 false
    drop(ws_student);

    let cleared = recv_until(&mut ws_advisor, "user_typing").await;
    assert_eq!(cleared["data"]["typing"], false);
    assert_eq!(cleared["data"]["userId"], student_id.to_string());
}

/// 认证门：未认证的事件被拒，坏凭证拿到 auth_error
#[tokio::test]
async fn authentication_gate() {
    let app = TestApp::spawn().await;
    let (_, student_token) = app.seed_user("Amina", UserRole::Student).await;

    let mut ws = connect_ws(&app).await;

    // 认证前的任何业务事件都拒绝
    send_event(
        &mut ws,
        json!({"event": "join_room", "data": {"chatRoomId": Uuid::new_v4()}}),
    )
    .await;
    let error = recv_until(&mut ws, "error").await;
    assert_eq!(error["data"]["code"], "AUTH_REQUIRED");

    // 坏凭证：连接保持未认证，但不断开
    send_event(
        &mut ws,
        json!({"event": "authenticate", "data": {"token": "garbage"}}),
    )
    .await;
    recv_until(&mut ws, "auth_error").await;

    // 垃圾帧只换来 VALIDATION_FAILED，连接照样活着
    send_event(&mut ws, json!({"event": "no_such_event", "data": {}})).await;
    let error = recv_until(&mut ws, "error").await;
    assert_eq!(error["data"]["code"], "VALIDATION_FAILED");

    // 同一条连接上补上好凭证仍然能认证成功
    let authed = authenticate(&mut ws, &student_token).await;
    assert_eq!(authed["data"]["user"]["name"], "Amina");
}

/// 旁观者发消息被访问控制门拦下
#[tokio::test]
async fn stranger_cannot_send_into_room() {
    let app = TestApp::spawn().await;
    let (_, student_token) = app.seed_user("Amina", UserRole::Student).await;
    let (advisor_id, _) = app.seed_user("Dr. Osei", UserRole::Advisor).await;
    let (_, stranger_token) = app.seed_user("Mallory", UserRole::Student).await;
    let client = Client::new();

    let room = client
        .post(app.http("/api/v1/rooms"))
        .header("authorization", format!("Bearer {}", student_token))
        .json(&json!({"participantId": advisor_id.to_string()}))
        .send()
        .await
        .expect("create room")
        .json::<serde_json::Value>()
        .await
        .expect("room json");
    let room_id = room["id"].as_str().unwrap();

    let mut ws = connect_ws(&app).await;
    authenticate(&mut ws, &stranger_token).await;

    send_event(
        &mut ws,
        json!({"event": "send_message", "data": {"chatRoomId": room_id, "content": "let me in"}}),
    )
    .await;
    let error = recv_until(&mut ws, "error").await;
    assert_eq!(error["data"]["code"], "ACCESS_DENIED");

    // 房间历史对旁观者同样关门
    let resp = client
        .get(app.http(&format!("/api/v1/rooms/{}/messages", room_id)))
        .header("authorization", format!("Bearer {}", stranger_token))
        .send()
        .await
        .expect("history as stranger");
    assert_eq!(resp.status(), 403);

    // 确认没有消息被广播出去
    assert_no_event(&mut ws, "message_received", Duration::from_millis(300)).await;
}
