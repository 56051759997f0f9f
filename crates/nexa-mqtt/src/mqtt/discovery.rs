// ── Home Assistant discovery ──
//
// One config message per entity, published to
// `<ha_prefix>/<component>/nexa_<serial>/<object_id>/config`. Entities read
// the bridge's own state topics through value templates. Writable entities
// send a one-field JSON object to the device's `parameters/set` topic, which
// goes through the same coalescer as any other command.

use serde::Serialize;

use nexa_core::DeviceRecord;

use super::topics::Topics;

const MANUFACTURER: &str = "Growatt";
const WORK_MODES: [&str; 2] = ["load_first", "battery_first"];
const STATUSES: [&str; 8] = [
    "offline",
    "load_first",
    "battery_first",
    "smart_self_use",
    "fault",
    "heating",
    "on_grid",
    "off_grid",
];
const ON_OFF: [&str; 2] = ["OFF", "ON"];

/// ON/OFF parameters: display name and parameter key.
const TOGGLES: [(&str, &str); 6] = [
    ("Allow Grid Charging", "allow_grid_charging"),
    ("Grid Connection Control", "grid_connection_control"),
    ("AC Couple Power Control", "ac_couple_power_control"),
    ("Light Load Enable", "light_load_enable"),
    ("Never Power Off", "never_power_off"),
    ("Anti Backflow Enable", "anti_backflow_enable"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Sensor,
    BinarySensor,
    Number,
    Select,
    Switch,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::BinarySensor => "binary_sensor",
            Self::Number => "number",
            Self::Select => "select",
            Self::Switch => "switch",
        }
    }
}

// ── Payload ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    identifiers: Vec<String>,
    name: String,
    manufacturer: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    sw_version: String,
    serial_number: String,
}

impl DeviceInfo {
    fn new(device: &DeviceRecord) -> Self {
        let name = if device.alias.trim().is_empty() {
            format!("NEXA {}", device.serial)
        } else {
            device.alias.clone()
        };
        Self {
            identifiers: vec![format!("nexa_{}", device.serial)],
            name,
            manufacturer: MANUFACTURER,
            model: device.model.clone(),
            sw_version: device.version.clone(),
            serial_number: device.serial.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Origin {
    name: &'static str,
    sw_version: &'static str,
    support_url: &'static str,
}

const ORIGIN: Origin = Origin {
    name: env!("CARGO_PKG_NAME"),
    sw_version: env!("CARGO_PKG_VERSION"),
    support_url: env!("CARGO_PKG_REPOSITORY"),
};

/// A discovery config payload. Unset options are left out of the JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    #[serde(skip)]
    pub component: Component,
    #[serde(skip)]
    pub object_id: String,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub value_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    pub device: DeviceInfo,
    pub origin: Origin,
}

impl Entity {
    fn class(mut self, class: &'static str) -> Self {
        self.device_class = Some(class);
        self
    }

    fn measured(mut self, unit: &'static str) -> Self {
        self.unit_of_measurement = Some(unit);
        self.state_class = Some("measurement");
        self
    }

    fn total(mut self, unit: &'static str) -> Self {
        self.unit_of_measurement = Some(unit);
        self.state_class = Some("total_increasing");
        self
    }

    fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    fn options(mut self, options: &[&'static str]) -> Self {
        self.options = options.to_vec();
        self
    }

    fn command(mut self, topic: String, template: String) -> Self {
        self.command_topic = Some(topic);
        self.command_template = Some(template);
        self
    }

    fn slider(mut self, min: f64, max: f64, unit: &'static str) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self.step = Some(1.0);
        self.mode = Some("slider");
        self.unit_of_measurement = Some(unit);
        self
    }

    fn payloads(mut self, on: &'static str, off: &'static str) -> Self {
        self.payload_on = Some(on);
        self.payload_off = Some(off);
        self
    }
}

// ── Discovery ───────────────────────────────────────────────────────

/// Builds discovery messages under one Home Assistant prefix.
#[derive(Debug, Clone)]
pub struct Discovery {
    prefix: String,
    switch_as_select: bool,
}

impl Discovery {
    pub fn new(prefix: impl Into<String>, switch_as_select: bool) -> Self {
        Self {
            prefix: prefix.into(),
            switch_as_select,
        }
    }

    /// Birth and will topic of Home Assistant itself.
    pub fn status_topic(&self) -> String {
        format!("{}/status", self.prefix)
    }

    pub fn config_topic(&self, serial: &str, entity: &Entity) -> String {
        format!(
            "{}/{}/nexa_{serial}/{}/config",
            self.prefix,
            entity.component.as_str(),
            entity.object_id
        )
    }

    /// `(topic, payload)` for every entity of `device`.
    pub fn messages(&self, topics: &Topics, device: &DeviceRecord) -> Vec<(String, Entity)> {
        self.entities(topics, device)
            .into_iter()
            .map(|entity| (self.config_topic(&device.serial, &entity), entity))
            .collect()
    }

    pub fn entities(&self, topics: &Topics, device: &DeviceRecord) -> Vec<Entity> {
        let b = Builder {
            serial: &device.serial,
            info: DeviceInfo::new(device),
            topics,
        };
        let mut entities = b.status_entities();
        for (index, alias) in device.batteries.iter().enumerate() {
            entities.extend(b.battery_entities(index, alias));
        }
        entities.extend(b.parameter_entities(self.switch_as_select));
        entities
    }
}

struct Builder<'a> {
    serial: &'a str,
    info: DeviceInfo,
    topics: &'a Topics,
}

impl Builder<'_> {
    fn entity(&self, component: Component, name: &str, key: &str, state_topic: String, field: &str) -> Entity {
        Entity {
            component,
            object_id: name.replace(' ', ""),
            name: name.to_owned(),
            unique_id: format!("{}_{key}", self.serial),
            state_topic,
            value_template: format!("{{{{ value_json.{field} }}}}"),
            command_topic: None,
            command_template: None,
            device_class: None,
            state_class: None,
            unit_of_measurement: None,
            icon: None,
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
            mode: None,
            payload_on: None,
            payload_off: None,
            device: self.info.clone(),
            origin: ORIGIN,
        }
    }

    fn sensor(&self, name: &str, field: &str) -> Entity {
        self.entity(Component::Sensor, name, field, self.topics.status(self.serial), field)
    }

    fn status_entities(&self) -> Vec<Entity> {
        let mut connectivity = self
            .entity(
                Component::BinarySensor,
                "Connectivity",
                "connectivity",
                self.topics.status(self.serial),
                "status",
            )
            .class("connectivity")
            .payloads("online", "offline");
        connectivity.value_template =
            "{{ 'offline' if value_json.status == 'offline' else 'online' }}".into();

        let mut heating = self
            .entity(
                Component::BinarySensor,
                "Heating",
                "heating",
                self.topics.status(self.serial),
                "status",
            )
            .icon("mdi:heat-wave")
            .payloads("heating", "not-heating");
        heating.value_template = "{{ 'heating' if value_json.status == 'heating' else 'not-heating' }}".into();

        vec![
            self.sensor("Output Power", "ac_w").class("power").measured("W"),
            self.sensor("Solar Power", "solar_w")
                .class("power")
                .measured("W")
                .icon("mdi:solar-power"),
            self.sensor("Charging Power", "charge_w")
                .class("power")
                .measured("W")
                .icon("mdi:battery-plus"),
            self.sensor("Discharge Power", "discharge_w")
                .class("power")
                .measured("W")
                .icon("mdi:battery-minus"),
            self.sensor("Generation Total", "generation_total_kwh")
                .class("energy")
                .total("kWh"),
            self.sensor("Generation Today", "generation_today_kwh")
                .class("energy")
                .total("kWh"),
            self.sensor("SoC", "soc").class("battery").measured("%"),
            self.sensor("Number Of Batteries", "battery_num").icon("mdi:car-battery"),
            self.sensor("Working Mode", "work_mode")
                .class("enum")
                .options(&WORK_MODES),
            self.sensor("Status", "status").class("enum").options(&STATUSES),
            connectivity,
            heating,
        ]
    }

    fn battery_entities(&self, index: usize, alias: &str) -> [Entity; 2] {
        let topic = self.topics.battery(self.serial, index);
        [
            self.entity(
                Component::Sensor,
                &format!("{alias} SoC"),
                &format!("{alias}_soc"),
                topic.clone(),
                "soc",
            )
            .class("battery")
            .measured("%"),
            self.entity(
                Component::Sensor,
                &format!("{alias} Temperature"),
                &format!("{alias}_temp"),
                topic,
                "temp",
            )
            .class("temperature")
            .measured("°C"),
        ]
    }

    fn writable(&self, component: Component, name: &str, key: &str, quoted: bool) -> Entity {
        let template = if quoted {
            format!("{{\"{key}\": \"{{{{ value }}}}\"}}")
        } else {
            format!("{{\"{key}\": {{{{ value }}}}}}")
        };
        self.entity(component, name, key, self.topics.parameters(self.serial), key)
            .command(self.topics.parameters_set(self.serial), template)
    }

    fn parameter_entities(&self, switch_as_select: bool) -> Vec<Entity> {
        let mut entities = vec![
            self.writable(Component::Number, "Default AC Output Power", "default_output_w", false)
                .class("power")
                .slider(0.0, 800.0, "W"),
            self.writable(Component::Number, "Charging Limit", "charging_limit", false)
                .slider(70.0, 100.0, "%")
                .icon("mdi:battery-arrow-up-outline"),
            self.writable(Component::Number, "Discharge Limit", "discharge_limit", false)
                .slider(0.0, 30.0, "%")
                .icon("mdi:battery-arrow-down-outline"),
            self.writable(
                Component::Number,
                "Anti Backflow Power Percentage",
                "anti_backflow_power_percentage",
                false,
            )
            .slider(0.0, 100.0, "%"),
            self.writable(Component::Select, "Default Mode", "default_mode", true)
                .options(&WORK_MODES),
        ];
        for (name, key) in TOGGLES {
            let entity = if switch_as_select {
                self.writable(Component::Select, name, key, true).options(&ON_OFF)
            } else {
                self.writable(Component::Switch, name, key, true)
                    .payloads("ON", "OFF")
            };
            entities.push(entity);
        }
        entities
    }
}
