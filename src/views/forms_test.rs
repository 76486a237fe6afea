use super::*;

#[test]
fn login_requires_both_fields() {
    let form = LoginForm { username: "  ".into(), password: "x".into() };
    assert_eq!(form.validate(), Err(FormError("Enter username and password.")));

    let form = LoginForm { username: "demo".into(), password: String::new() };
    assert!(form.validate().is_err());

    let form = LoginForm { username: " demo ".into(), password: "demo1234".into() };
    assert_eq!(
        form.validate(),
        Ok(LoginRequest { username: "demo".into(), password: "demo1234".into() })
    );
}

#[test]
fn register_validates_each_field() {
    let ok = RegisterForm { username: "ada".into(), email: "ada@example.com".into(), password: "secret1".into() };
    assert!(ok.validate().is_ok());

    let form = RegisterForm { username: String::new(), ..ok.clone() };
    assert_eq!(form.validate(), Err(FormError("Username is required.")));

    for email in ["", "ada", "@example.com", "ada@", "a b@example.com", "ada@@example.com", "ada@.com"] {
        let form = RegisterForm { email: email.into(), ..ok.clone() };
        assert_eq!(form.validate(), Err(FormError("Enter a valid email address.")), "email {email:?}");
    }

    let form = RegisterForm { password: "12345".into(), ..ok };
    assert_eq!(form.validate(), Err(FormError("Password must be at least 6 characters.")));
}

#[test]
fn sensor_form_prefills_from_sensor() {
    let sensor = Sensor { id: 1, name: "Attic".into(), model: "DHT22".into(), description: None };
    let form = SensorForm::from_sensor(&sensor);
    assert_eq!(form, SensorForm { name: "Attic".into(), model: "DHT22".into(), description: String::new() });
}

#[test]
fn sensor_create_omits_blank_description_update_keeps_it() {
    let form = SensorForm { name: " Attic ".into(), model: "DHT22".into(), description: "  ".into() };
    assert_eq!(form.validate_create().unwrap().description, None);
    assert_eq!(form.validate_create().unwrap().name, "Attic");
    assert_eq!(form.validate_update().unwrap().description, Some(String::new()));
}

#[test]
fn sensor_form_requires_name_and_model() {
    let form = SensorForm { name: "Attic".into(), model: " ".into(), description: String::new() };
    assert_eq!(form.validate_create(), Err(FormError("Name and model are required.")));
    assert_eq!(form.validate_update(), Err(FormError("Name and model are required.")));
}

#[test]
fn reading_form_parses_numbers_and_timestamp() {
    let form = ReadingForm { temperature: "21.5".into(), humidity: " 40 ".into(), timestamp: "2024-03-01T12:00:00Z".into() };
    let input = form.validate().unwrap();
    assert!((input.temperature - 21.5).abs() < f64::EPSILON);
    assert!((input.humidity - 40.0).abs() < f64::EPSILON);
    assert_eq!(input.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
}

#[test]
fn reading_form_errors() {
    let base = ReadingForm { temperature: "1".into(), humidity: "2".into(), timestamp: "2024-03-01T12:00:00Z".into() };
    assert_eq!(
        ReadingForm { humidity: String::new(), ..base.clone() }.validate(),
        Err(FormError("Temperature, humidity, and timestamp are required."))
    );
    assert_eq!(
        ReadingForm { temperature: "warm".into(), ..base.clone() }.validate(),
        Err(FormError("Temperature must be a number."))
    );
    assert_eq!(
        ReadingForm { humidity: "NaN".into(), ..base.clone() }.validate(),
        Err(FormError("Humidity must be a number."))
    );
    assert_eq!(
        ReadingForm { timestamp: "yesterday".into(), ..base }.validate(),
        Err(FormError("Timestamp must be a date and time."))
    );
}

#[test]
fn parse_datetime_accepts_offsets() {
    let parsed = parse_datetime_input("2024-03-01T14:00:00+02:00").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
}

#[test]
fn parse_datetime_treats_naive_input_as_local_time() {
    let expected = Local
        .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
        .earliest()
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(parse_datetime_input("2024-03-01T12:30"), Some(expected));
    assert_eq!(parse_datetime_input("2024-03-01 12:30"), Some(expected));

    let midnight = Local.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).earliest().unwrap().with_timezone(&Utc);
    assert_eq!(parse_datetime_input("2024-03-01"), Some(midnight));
}

#[test]
fn parse_datetime_rejects_garbage() {
    assert_eq!(parse_datetime_input(""), None);
    assert_eq!(parse_datetime_input("03/01/2024"), None);
}

#[test]
fn filter_form_open_bounds_and_ordering() {
    assert_eq!(FilterForm::default().validate(), Ok(TimeRange::default()));

    let form = FilterForm { start: "2024-03-02T00:00:00Z".into(), end: "2024-03-01T00:00:00Z".into() };
    assert_eq!(form.validate(), Err(FormError("Start must be before end.")));

    let form = FilterForm { start: "nope".into(), end: String::new() };
    assert_eq!(form.validate(), Err(FormError("Start must be a date and time.")));

    let form = FilterForm { start: String::new(), end: "2024-03-01T00:00:00Z".into() };
    let range = form.validate().unwrap();
    assert_eq!(range.start, None);
    assert_eq!(range.end, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
}
