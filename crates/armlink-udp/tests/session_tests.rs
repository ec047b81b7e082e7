//! 会话端到端测试（回环 UDP，临时端口）

use armlink_protocol::{Command, decode_command, encode_telemetry};
use armlink_udp::{ArmLink, Endpoint, LinkConfig, LinkError};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

/// 模拟 mbed 一侧的对端 socket
fn peer_socket() -> UdpSocket {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    peer
}

fn config_for(peer: &UdpSocket) -> LinkConfig {
    let port = peer.local_addr().unwrap().port();
    LinkConfig::new(Endpoint::loopback(0), Endpoint::loopback(port))
}

fn recv_byte(peer: &UdpSocket) -> u8 {
    let mut buf = [0u8; 16];
    let (n, _) = peer.recv_from(&mut buf).unwrap();
    assert_eq!(n, 1, "command datagrams are a single byte");
    buf[0]
}

#[test]
fn test_connect_sends_handshake() {
    let peer = peer_socket();
    let link = ArmLink::connect(config_for(&peer)).unwrap();

    assert_eq!(recv_byte(&peer), 0b0000_0001);
    link.close();
}

#[test]
fn test_yaw_command_end_to_end() {
    let peer = peer_socket();
    let mut link = ArmLink::connect(config_for(&peer)).unwrap();
    assert_eq!(recv_byte(&peer), 1);

    let sent = link.send_command(&Command::motion(0, 0, 1)).unwrap();
    assert_eq!(sent, 0b0100_0000);

    let byte = recv_byte(&peer);
    assert_eq!(byte, 0b0100_0000);

    let decoded = decode_command(byte);
    assert_eq!(decoded.yaw, 1);
    assert_eq!(decoded.linear, 0);
    assert_eq!(decoded.pitch, 0);
    assert_eq!(decoded.mode, 0);

    assert_eq!(link.stats().commands_sent, 1);
    link.close();
}

#[test]
fn test_receive_latest_telemetry_frame() {
    let peer = peer_socket();
    let mut link = ArmLink::connect(config_for(&peer)).unwrap();
    let local = link.local_addr();

    peer.send_to(&encode_telemetry(&[0.0, 0.5]), local).unwrap();
    peer.send_to(&encode_telemetry(&[1.0, 2.5, 3.0]), local).unwrap();
    thread::sleep(Duration::from_millis(50));

    let frame = link.receive_telemetry().unwrap().unwrap();
    assert_eq!(frame.values(), &[1.0, 2.5, 3.0]);

    // 积压已被丢弃
    assert_eq!(link.receive_telemetry().unwrap(), None);

    let stats = link.stats();
    assert_eq!(stats.frames_received, 1);
    assert_eq!(stats.empty_polls, 1);
    link.close();
}

#[test]
fn test_bad_telemetry_is_parse_error() {
    let peer = peer_socket();
    let mut link = ArmLink::connect(config_for(&peer)).unwrap();

    peer.send_to(b"1.0 x", link.local_addr()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let err = link.receive_telemetry().unwrap_err();
    assert!(err.is_parse_error(), "unexpected error: {}", err);
    assert_eq!(link.stats().parse_errors, 1);

    // 解析失败不影响后续接收
    peer.send_to(b"4 5 6", link.local_addr()).unwrap();
    thread::sleep(Duration::from_millis(50));
    let frame = link.receive_telemetry().unwrap().unwrap();
    assert_eq!(frame.values(), &[4.0, 5.0, 6.0]);
    link.close();
}

#[test]
fn test_empty_datagram_is_empty_frame() {
    let peer = peer_socket();
    let mut link = ArmLink::connect(config_for(&peer)).unwrap();

    peer.send_to(b"", link.local_addr()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let frame = link.receive_telemetry().unwrap().unwrap();
    assert!(frame.is_empty());
    link.close();
}

#[test]
fn test_bound_session_can_close() {
    let peer = peer_socket();
    let link = ArmLink::bind(config_for(&peer)).unwrap();
    let local = link.local_addr();
    link.close();

    // 端口已释放，可以重新绑定
    let rebound = UdpSocket::bind(local).unwrap();
    assert_eq!(rebound.local_addr().unwrap().port(), local.port());
}

#[test]
fn test_unresolvable_peer() {
    let config = LinkConfig::new(
        Endpoint::loopback(0),
        Endpoint::new("no-such-host.invalid", 50000),
    );
    assert!(matches!(
        ArmLink::bind(config),
        Err(LinkError::InvalidAddress(_))
    ));
}

#[test]
fn test_zero_wait_receive_skips_backlog() {
    let peer = peer_socket();
    let mut link = ArmLink::connect(config_for(&peer)).unwrap();
    let local = link.local_addr();

    for i in 1..=5 {
        peer.send_to(&encode_telemetry(&[i as f64]), local).unwrap();
    }
    thread::sleep(Duration::from_millis(50));

    let payload = link.receive_latest(Duration::ZERO).unwrap().unwrap();
    assert_eq!(payload, encode_telemetry(&[5.0]));
    assert_eq!(link.receive_latest(Duration::ZERO).unwrap(), None);
    link.close();
}
