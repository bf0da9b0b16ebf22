pub mod key_material_settings;
