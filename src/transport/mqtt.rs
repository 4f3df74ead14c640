use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use dotenv::dotenv;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeReasonCode};
use tokio::time::{sleep, timeout};

use super::{ingest_or_warn, TransportContext, TransportError};
use crate::config::{MqttConfig, TransportConfig};
use crate::types::ConnectionStatus;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// 在当前线程上运行MQTT传输，直到收到关闭信号
///
/// 设备的UART通知数据被桥接到 `mqtt.topic`，每条消息一帧。
/// 链路出错时标记为断开，并在 `transport.retry_delay_secs` 后无限重试。
pub fn run_mqtt_transport(
    mqtt: &MqttConfig,
    transport: &TransportConfig,
    ctx: TransportContext,
) -> Result<(), TransportError> {
    dotenv().ok(); // 加载 .env 文件

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(reconnect_loop(mqtt, transport, &ctx));
    Ok(())
}

async fn reconnect_loop(mqtt: &MqttConfig, transport: &TransportConfig, ctx: &TransportContext) {
    while !ctx.shutdown.load(Ordering::Relaxed) {
        info!("Connecting to MQTT broker {}:{}...", mqtt.broker, mqtt.port);

        match run_session(mqtt, transport, ctx).await {
            Ok(()) => break,
            Err(e) => {
                ctx.status.set_connected(false);
                warn!("{}. Retrying in {}s", e, transport.retry_delay_secs);
                sleep_unless_shutdown(transport.retry_delay(), &ctx.shutdown).await;
            }
        }
    }

    ctx.status.set_connected(false);
    info!("MQTT transport received shutdown signal, exiting gracefully");
}

async fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        sleep(remaining.min(SHUTDOWN_POLL)).await;
    }
}

fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

fn mqtt_options(mqtt: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(mqtt.client_id.clone(), mqtt.broker.clone(), mqtt.port);
    options.set_keep_alive(Duration::from_secs(u64::from(mqtt.keep_alive.max(5))));

    // 凭据可选
    if let (Ok(user), Ok(pass)) = (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        options.set_credentials(user, pass);
    }

    options
}

/// 等待服务器接受连接，超时视为设备未找到
async fn wait_for_connack(eventloop: &mut EventLoop, transport: &TransportConfig) -> Result<(), TransportError> {
    let connect = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return if ack.code == ConnectReturnCode::Success {
                        Ok(())
                    } else {
                        Err(TransportError::Client(format!("broker refused connection: {:?}", ack.code)))
                    };
                }
                Ok(_) => {}
                Err(e) => return Err(TransportError::ConnectionDropped(e.to_string())),
            }
        }
    };

    match timeout(transport.scan_timeout(), connect).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::DeviceNotFound { timeout_secs: transport.scan_timeout_secs }),
    }
}

/// 已连接链路是否超过 `stale_after` 没有数据
fn is_stale(status: &ConnectionStatus, connected_at: Instant, stale_after: Duration) -> bool {
    match status.seconds_since_update(Utc::now()) {
        Some(secs) => secs > stale_after.as_secs_f64(),
        None => connected_at.elapsed() > stale_after,
    }
}

async fn run_session(
    mqtt: &MqttConfig,
    transport: &TransportConfig,
    ctx: &TransportContext,
) -> Result<(), TransportError> {
    let (client, mut eventloop) = AsyncClient::new(mqtt_options(mqtt), 10);

    wait_for_connack(&mut eventloop, transport).await?;

    client
        .subscribe(mqtt.topic.as_str(), qos_from(mqtt.qos))
        .await
        .map_err(|e| TransportError::Client(e.to_string()))?;

    ctx.status.set_connected(true);
    info!("Connected to {}:{}, listening on '{}'", mqtt.broker, mqtt.port, mqtt.topic);

    let connected_at = Instant::now();
    let mut last_heartbeat = Instant::now();
    let mut heartbeat_count: u64 = 0;
    let mut stale_warned = false;

    loop {
        // 检查关闭信号
        if ctx.shutdown.load(Ordering::Relaxed) {
            client.disconnect().await.ok();
            return Ok(());
        }

        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == mqtt.topic => {
                ingest_or_warn(&publish.payload[..], ctx);
                stale_warned = false;
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                if ack.return_codes.iter().any(|c| matches!(c, SubscribeReasonCode::Failure)) {
                    return Err(TransportError::ChannelUnavailable(format!(
                        "subscription to '{}' rejected",
                        mqtt.topic
                    )));
                }
                debug!("Subscription to '{}' acknowledged", mqtt.topic);
            }
            Ok(_) => {}
            Err(e) => return Err(TransportError::ConnectionDropped(e.to_string())),
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            heartbeat_count += 1;
            last_heartbeat = Instant::now();
            info!("Connection active - heartbeat #{}", heartbeat_count);
        }

        if !stale_warned && is_stale(&ctx.status.get(), connected_at, transport.stale_after()) {
            warn!("No data received for {}s, checking connection...", transport.stale_after_secs);
            stale_warned = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_qos_mapping() {
        assert_eq!(qos_from(0), QoS::AtMostOnce);
        assert_eq!(qos_from(1), QoS::AtLeastOnce);
        assert_eq!(qos_from(2), QoS::ExactlyOnce);
    }

    #[test]
    fn test_stale_detection() {
        let stale_after = Duration::from_secs(30);
        let fresh = ConnectionStatus {
            connected: true,
            last_update: Some(Utc::now() - ChronoDuration::seconds(5)),
        };
        assert!(!is_stale(&fresh, Instant::now(), stale_after));

        let quiet = ConnectionStatus {
            connected: true,
            last_update: Some(Utc::now() - ChronoDuration::seconds(60)),
        };
        assert!(is_stale(&quiet, Instant::now(), stale_after));

        let never = ConnectionStatus { connected: true, last_update: None };
        assert!(!is_stale(&never, Instant::now(), stale_after));
    }

    #[test]
    fn test_unreachable_broker_times_out_as_not_found() {
        let transport = TransportConfig { scan_timeout_secs: 1, ..TransportConfig::default() };
        // TEST-NET-1 地址，不会有响应
        let mqtt = MqttConfig { broker: "192.0.2.1".to_string(), ..MqttConfig::default() };
        let (_client, mut eventloop) = AsyncClient::new(mqtt_options(&mqtt), 10);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = runtime.block_on(wait_for_connack(&mut eventloop, &transport));

        assert!(matches!(
            result,
            Err(TransportError::DeviceNotFound { timeout_secs: 1 }) | Err(TransportError::ConnectionDropped(_))
        ));
    }
}
