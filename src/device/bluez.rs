use std::collections::HashMap;
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue};
use zbus::{Connection, Proxy, fdo::ObjectManagerProxy, fdo::PropertiesProxy};

use crate::device::constants::{ADAPTER_INTERFACE, BATTERY_INTERFACE, BLUEZ_SERVICE, DEVICE_INTERFACE};
use crate::device::transport::{PropertyWatch, Transport};
use crate::device::types::{DeviceIdentity, DeviceSnapshot, PropertyChange};
use crate::error::TransportError;

type Properties = HashMap<String, OwnedValue>;

struct DeviceObject {
    path: OwnedObjectPath,
    properties: Properties,
    battery: Option<u8>,
}

struct Inventory {
    has_adapter: bool,
    devices: Vec<DeviceObject>,
}

impl Inventory {
    fn find(&self, address: &str) -> Option<&DeviceObject> {
        self.devices.iter().find(|device| {
            get_string(&device.properties, "Address")
                .map(|addr| addr.eq_ignore_ascii_case(address))
                .unwrap_or(false)
        })
    }
}

/// Local devices managed by bluez, over the system bus.
#[derive(Clone)]
pub struct BluezTransport {
    conn: Connection,
}

impl BluezTransport {
    pub async fn new() -> Result<Self, TransportError> {
        let conn = Connection::system().await?;
        Ok(BluezTransport { conn })
    }

    async fn inventory(&self) -> Result<Inventory, TransportError> {
        let om = ObjectManagerProxy::builder(&self.conn)
            .destination(BLUEZ_SERVICE)?
            .path("/")?
            .build()
            .await?;

        let objects = om.get_managed_objects().await.map_err(inventory_error)?;
        let mut inventory = Inventory { has_adapter: false, devices: Vec::new() };

        for (path, ifaces) in objects {
            let mut device = None;
            let mut battery = None;

            for (iface, properties) in ifaces {
                match iface.as_str() {
                    ADAPTER_INTERFACE => inventory.has_adapter = true,
                    DEVICE_INTERFACE => device = Some(properties),
                    BATTERY_INTERFACE => battery = get_u8(&properties, "Percentage"),
                    _ => {},
                }
            }

            if let Some(properties) = device {
                inventory.devices.push(DeviceObject { path, properties, battery });
            }
        }

        // managed objects come back unordered
        sort_by_path(&mut inventory.devices);
        Ok(inventory)
    }

    async fn device_path(&self, address: &str) -> Result<OwnedObjectPath, TransportError> {
        let inventory = self.inventory().await?;
        match inventory.find(address) {
            Some(device) => Ok(device.path.clone()),
            None => Err(TransportError::UnknownDevice { address: address.to_string() }),
        }
    }

    async fn call_device(&self, address: &str, method: &str) -> Result<(), TransportError> {
        let path = self.device_path(address).await?;
        let dev = Proxy::new(&self.conn, BLUEZ_SERVICE, path, DEVICE_INTERFACE).await?;

        info!("Calling {} on device {}", method, address);
        dev.call_method(method, &()).await?;
        Ok(())
    }
}

impl Transport for BluezTransport {
    async fn enumerate(&self) -> Result<Vec<DeviceSnapshot>, TransportError> {
        let inventory = self.inventory().await?;
        if !inventory.has_adapter {
            return Err(TransportError::NoAdapter);
        }

        // a single unreadable device fails the whole enumeration
        inventory.devices
            .iter()
            .map(snapshot_from)
            .collect()
    }

    async fn get(&self, address: &str) -> Result<DeviceSnapshot, TransportError> {
        let inventory = self.inventory().await?;
        match inventory.find(address) {
            Some(device) => snapshot_from(device),
            None => Err(TransportError::UnknownDevice { address: address.to_string() }),
        }
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        self.call_device(address, "Connect").await
    }

    async fn disconnect(&self, address: &str) -> Result<(), TransportError> {
        self.call_device(address, "Disconnect").await
    }

    async fn watch(&self, address: &str) -> Result<PropertyWatch, TransportError> {
        let path = self.device_path(address).await?;

        let props = PropertiesProxy::builder(&self.conn)
            .destination(BLUEZ_SERVICE)?
            .path(path)?
            .build()
            .await?;

        let signals = props.receive_properties_changed().await?;
        let watched_address = address.to_string();

        let changes = signals
            .flat_map(move |signal| {
                let changes: Vec<PropertyChange> = match signal.args() {
                    Ok(args) if args.interface_name().as_str() == DEVICE_INTERFACE => args
                        .changed_properties()
                        .keys()
                        .map(|name| PropertyChange {
                            address: watched_address.clone(),
                            name: name.to_string(),
                        })
                        .collect(),
                    Ok(_) => Vec::new(),
                    Err(err) => {
                        warn!("Failed to decode PropertiesChanged for {}: {:?}", watched_address, err);
                        Vec::new()
                    },
                };

                stream::iter(changes)
            })
            .boxed();

        debug!("Watching properties of {}", address);
        Ok(PropertyWatch { address: address.to_string(), changes })
    }

    async fn unwatch(&self, watch: PropertyWatch) {
        // dropping the signal stream removes its match rule from the bus
        debug!("Releasing property watch of {}", watch.address);
        drop(watch);
    }

    async fn battery_level(&self, address: &str) -> Option<u8> {
        let inventory = match self.inventory().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query bluez for the battery of {}: {}", address, err);
                return None;
            },
        };

        let device = inventory.find(address)?;
        if !get_bool(&device.properties, "Connected").unwrap_or(false) {
            return None;
        }

        device.battery
    }
}

// bluetoothd not running is the same as having no adapter
fn inventory_error(err: zbus::fdo::Error) -> TransportError {
    match err {
        zbus::fdo::Error::ServiceUnknown(_) | zbus::fdo::Error::NameHasNoOwner(_) => {
            warn!("bluez is not available: {}", err);
            TransportError::NoAdapter
        },
        err => err.into(),
    }
}

fn sort_by_path(devices: &mut [DeviceObject]) {
    devices.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
}

fn snapshot_from(device: &DeviceObject) -> Result<DeviceSnapshot, TransportError> {
    let props = &device.properties;
    let missing = |property: &'static str| TransportError::MissingProperty {
        path: device.path.as_str().to_string(),
        property,
    };

    let address = get_string(props, "Address").ok_or_else(|| missing("Address"))?;
    let trusted = get_bool(props, "Trusted").ok_or_else(|| missing("Trusted"))?;
    let connected = get_bool(props, "Connected").unwrap_or(false);

    let alias = get_string(props, "Alias")
        .or_else(|| get_string(props, "Name"))
        .unwrap_or_else(|| address.clone());

    Ok(DeviceSnapshot {
        identity: DeviceIdentity::local(address),
        alias,
        connected,
        paired: get_bool(props, "Paired").unwrap_or(false),
        trusted,
        icon: get_string(props, "Icon").unwrap_or_else(|| "bluetooth".to_string()),
        battery: if connected { device.battery } else { None },
    })
}

fn get_bool(props: &Properties, key: &str) -> Option<bool> {
    props.get(key).and_then(|v| bool::try_from(v).ok())
}

fn get_u8(props: &Properties, key: &str) -> Option<u8> {
    props.get(key).and_then(|v| u8::try_from(v).ok())
}

fn get_string(props: &Properties, key: &str) -> Option<String> {
    props.get(key).and_then(|v| <&str>::try_from(v).ok()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(path: &str) -> DeviceObject {
        DeviceObject {
            path: OwnedObjectPath::try_from(path).unwrap(),
            properties: Properties::new(),
            battery: None,
        }
    }

    #[test]
    fn test_devices_are_ordered_by_path() {
        let mut devices = vec![
            object("/org/bluez/hci0/dev_CC_00"),
            object("/org/bluez/hci0/dev_AA_00"),
            object("/org/bluez/hci1/dev_00_00"),
            object("/org/bluez/hci0/dev_BB_00"),
        ];
        sort_by_path(&mut devices);

        let paths: Vec<&str> = devices.iter().map(|device| device.path.as_str()).collect();
        assert_eq!(paths, vec![
            "/org/bluez/hci0/dev_AA_00",
            "/org/bluez/hci0/dev_BB_00",
            "/org/bluez/hci0/dev_CC_00",
            "/org/bluez/hci1/dev_00_00",
        ]);
    }

    #[test]
    fn test_missing_bluez_service_means_no_adapter() {
        let err = inventory_error(zbus::fdo::Error::ServiceUnknown("org.bluez".to_string()));
        assert!(matches!(err, TransportError::NoAdapter));

        let err = inventory_error(zbus::fdo::Error::NameHasNoOwner("org.bluez".to_string()));
        assert!(matches!(err, TransportError::NoAdapter));

        let err = inventory_error(zbus::fdo::Error::AccessDenied("nope".to_string()));
        assert!(matches!(err, TransportError::DbusFdo { .. }));
    }

    #[test]
    fn test_device_without_address_is_unreadable() {
        let device = object("/org/bluez/hci0/dev_AA_00");
        assert!(matches!(
            snapshot_from(&device),
            Err(TransportError::MissingProperty { property: "Address", .. })
        ));
    }
}
