use busline_catalog::{Bus, BusType, Location, Route, SeatLayout, SeatStatus, SeatType, Trip, TripStatus};
use busline_core::repository::{StoreError, StoreResult, TripRepository};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::info;
use uuid::Uuid;

fn place(name: &str, lat: f64, lng: f64) -> Location {
    Location { name: name.to_string(), coords: [lat, lng] }
}

fn routes() -> Vec<Route> {
    vec![
        Route {
            id: "R01".into(),
            origin: place("Hubli", 15.3592, 75.1240),
            destination: place("Bengaluru", 12.9716, 77.5946),
            stops: vec![
                place("Davanagere", 14.4645, 75.9218),
                place("Chitradurga", 14.2251, 76.3982),
                place("Tumakuru", 13.3426, 77.1017),
            ],
            distance_km: 411.0,
        },
        Route {
            id: "R02".into(),
            origin: place("Dharwad", 15.4589, 75.0078),
            destination: place("Mysuru", 12.2958, 76.6394),
            stops: vec![place("Hassan", 13.0033, 76.1004), place("Channarayapatna", 12.9036, 76.3899)],
            distance_km: 480.0,
        },
        Route {
            id: "R03".into(),
            origin: place("Bengaluru", 12.9716, 77.5946),
            destination: place("Hubli", 15.3592, 75.1240),
            stops: vec![
                place("Tumakuru", 13.3426, 77.1017),
                place("Chitradurga", 14.2251, 76.3982),
                place("Davanagere", 14.4645, 75.9218),
            ],
            distance_km: 411.0,
        },
        Route {
            id: "R04".into(),
            origin: place("Mangaluru", 12.9141, 74.8560),
            destination: place("Bengaluru", 12.9716, 77.5946),
            stops: vec![place("Sakleshpura", 12.9698, 75.7834), place("Hassan", 13.0033, 76.1004)],
            distance_km: 352.0,
        },
    ]
}

fn bus(id: &str, registration: &str, rows: u32, cols: u32, seat_type: SeatType, bus_type: BusType) -> Bus {
    let mut layout = SeatLayout::generate(rows, cols, seat_type);
    // Deterministic sprinkle of sold seats so demo maps are not empty.
    for (i, seat) in layout.seats.iter_mut().enumerate() {
        if i % 5 == 4 {
            seat.status = SeatStatus::Booked;
        }
    }
    Bus {
        id: id.to_string(),
        registration_number: registration.to_string(),
        capacity: layout.seats.len() as u32,
        seat_layout: layout,
        operator: "KSRTC".to_string(),
        bus_type,
    }
}

fn at(day: DateTime<Utc>, day_offset: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    (day.date_naive() + Duration::days(day_offset)).and_time(time).and_utc()
}

/// Four overnight Karnataka trips departing on the day of `today`.
pub fn demo_trips(today: DateTime<Utc>) -> Vec<Trip> {
    let routes = routes();
    let volvo = bus("B01", "KA-19-F-3456", 12, 5, SeatType::Seater, BusType::VolvoMultiAxle);
    let sleeper = bus("B02", "KA-25-G-7890", 10, 3, SeatType::Sleeper, BusType::AcSleeper);
    let seater = bus("B03", "KA-01-H-1234", 13, 5, SeatType::Seater, BusType::NonAcSeater);

    let plan = [
        (&routes[0], &volvo, (21, 30), (5, 0), 750, TripStatus::Onroute, Some([14.5, 76.0])),
        (&routes[1], &sleeper, (22, 0), (6, 30), 1100, TripStatus::Scheduled, None),
        (&routes[2], &seater, (22, 15), (5, 45), 550, TripStatus::Scheduled, None),
        (&routes[0], &sleeper, (23, 0), (6, 0), 1200, TripStatus::Onroute, Some([13.8, 76.5])),
    ];

    plan.into_iter()
        .map(|(route, bus, (sh, sm), (eh, em), fare, status, location)| {
            let mut trip = Trip {
                id: Uuid::new_v4(),
                route_id: route.id.clone(),
                bus_id: bus.id.clone(),
                start_time: at(today, 0, sh, sm),
                end_time: at(today, 1, eh, em),
                fare,
                status,
                seats_available: 0,
                route: route.clone(),
                bus: bus.clone(),
                current_location: location,
                version: 0,
            };
            trip.recount();
            trip
        })
        .collect()
}

const ALL_STATUSES: [TripStatus; 4] = [
    TripStatus::Scheduled,
    TripStatus::Onroute,
    TripStatus::Completed,
    TripStatus::Cancelled,
];

/// Insert the demo trips unless the store already has trips of any status.
pub async fn seed_demo_data(store: &dyn TripRepository) -> StoreResult<usize> {
    let mut existing = 0;
    for status in ALL_STATUSES {
        existing += store.list_trips_by_status(status).await?.len();
    }
    if existing > 0 {
        info!("{} trip(s) already present, skipping demo seed", existing);
        return Ok(0);
    }
    let trips = demo_trips(Utc::now());
    let mut inserted = 0;
    for trip in &trips {
        match store.insert_trip(trip).await {
            Ok(()) => inserted += 1,
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }
    info!("Seeded {} demo trip(s)", inserted);
    Ok(inserted)
}
