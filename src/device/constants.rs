/**
 * How long (milliseconds) to wait after a connect before reading the battery level.
 * The battery service is not enumerable right after the connection is established.
 */
pub const SETTLE_DELAY: u64 = 1000;

/**
 * How many source updates may be queued for the reconciliation loop before the sources block.
 */
pub const UPDATE_CHANNEL_CAPACITY: usize = 1;

/**
 * How many remote events may be queued per remote client.
 */
pub const REMOTE_EVENT_CAPACITY: usize = 8;

/**
 * How often (milliseconds) to attempt to reach an unreachable remote peer again.
 */
pub const REMOTE_RECONNECT_DELAY: u64 = 5000;

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_INTERFACE: &str = "org.bluez.Device1";

/**
 * Exposed by bluez on the device path once the GATT battery service (0x180f) is resolved.
 */
pub const BATTERY_INTERFACE: &str = "org.bluez.Battery1";

/**
 * Lower bounds (percent) of the battery level bands, highest first.
 */
pub const BATTERY_BANDS: [u8; 4] = [90, 70, 50, 30];
