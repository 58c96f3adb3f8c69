use iq_core::save::{codec, SaveError, SaveFormat, SaveManager, SAVE_VERSION};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Checking Save Pipeline Integration...");

    let manager = SaveManager::new();

    // Test 1: Fresh save round trip
    println!("\n🧪 Test 1: Fresh save round trip");

    let payload = json!({
        "hero": {"level": 42, "gold": 1250, "experience": 9000},
        "inventory": {"inventoryItems": [{"rarity": "EPIC"}, {"rarity": "RARE"}]},
        "statistics": {"goldEarned": 99999, "monstersSlain": 1234, "deaths": 3, "highestLevel": 42},
        "options": {"soundEnabled": true, "musicEnabled": false},
        "prestige": {"points": 7, "totalResets": 2}
    });

    let raw = manager.save_current(&payload)?;
    println!("✅ Encoded {} bytes of JSON into {} storage characters", payload.to_string().len(), raw.len());

    let loaded = manager.load(&raw)?;
    if loaded.version == SAVE_VERSION && !loaded.migrated && loaded.format == SaveFormat::Current {
        println!("✅ Round trip at {} with no migrations", loaded.version);
    } else {
        return Err("fresh save should load at the current version untouched".into());
    }

    if loaded.payload["hero"]["gold"] == 1250 && loaded.payload["prestige"]["points"] == 7 {
        println!("✅ Payload sections intact");
    } else {
        return Err("payload sections lost in round trip".into());
    }

    // Test 2: Historical save migration
    println!("\n🧪 Test 2: Historical save migration");

    let ancient = json!({
        "options": {"version": "0.7.9", "soundEnabled": true},
        "inventory": {"inventoryItems": [{"rarity": "UNIQUE"}]}
    });
    let ancient_raw = codec::encode(&ancient.to_string())?;

    let upgraded = manager.load(&ancient_raw)?;
    if upgraded.migrated && upgraded.version == SAVE_VERSION {
        println!("✅ Migrated 0.7.9 save up to {}", upgraded.version);
    } else {
        return Err("historical save should have been migrated".into());
    }

    if upgraded.payload["inventory"]["inventoryItems"][0]["rarity"] == "EPIC" {
        println!("✅ UNIQUE rarity renamed to EPIC");
    } else {
        return Err("rarity rename migration did not apply".into());
    }

    // Test 3: Corrupt input handling
    println!("\n🧪 Test 3: Corrupt input handling");

    match manager.load("### definitely not a save slot ###") {
        Err(SaveError::Corrupt) => println!("✅ Corrupt input reported cleanly"),
        Err(other) => return Err(format!("unexpected error kind: {}", other).into()),
        Ok(_) => return Err("corrupt input should not load".into()),
    }

    println!("\n🎉 ALL SAVE PIPELINE CHECKS PASSED!");
    println!("✅ Deflate + Base64 codec working");
    println!("✅ Version migration chain working");
    println!("✅ Corrupt input handling robust");

    Ok(())
}
